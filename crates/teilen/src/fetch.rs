use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Result of fetching a resolved location.
pub enum Content {
    File(FileDownload),
    /// Folder downloads would need an archive, which is not implemented
    UnsupportedFolder,
}

/// An opened file ready to be streamed as an attachment.
pub struct FileDownload {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
    file: fs::File,
}

/// Open `path` for download, or report it as unsupported if it is not a regular file.
pub async fn fetch(path: &Path) -> std::io::Result<Content> {
    let metadata = fs::metadata(path).await?;
    if !metadata.is_file() {
        debug!("Refusing non-file download: {}", path.display());
        return Ok(Content::UnsupportedFolder);
    }

    let file = fs::File::open(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Ok(Content::File(FileDownload {
        path: path.to_path_buf(),
        file_name,
        mime,
        size: metadata.len(),
        file,
    }))
}

/// `Content-Disposition` value for an attachment.
///
/// Quotes and control characters are replaced in the plain `filename`; names
/// with non-ASCII characters additionally get an RFC 5987 `filename*`.
pub fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if file_name.is_ascii() {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

impl IntoResponse for FileDownload {
    fn into_response(self) -> Response {
        debug!("Streaming file: {}", self.path.display());

        let body = Body::from_stream(ReaderStream::new(self.file));

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.mime),
                (header::CONTENT_LENGTH, self.size.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    attachment_disposition(&self.file_name),
                ),
            ],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disposition_plain() {
        assert_eq!(
            attachment_disposition("a.txt"),
            "attachment; filename=\"a.txt\""
        );
        assert_eq!(
            attachment_disposition("say \"hi\".txt"),
            "attachment; filename=\"say 'hi'.txt\""
        );
    }

    #[test]
    fn test_disposition_non_ascii() {
        assert_eq!(
            attachment_disposition("grüße.txt"),
            "attachment; filename=\"gr__e.txt\"; filename*=UTF-8''gr%C3%BC%C3%9Fe.txt"
        );
    }

    #[tokio::test]
    async fn test_fetch_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, "0123456789").unwrap();

        let Content::File(download) = fetch(&path).await.unwrap() else {
            panic!("expected a file download");
        };
        assert_eq!(download.file_name, "a.txt");
        assert_eq!(download.size, 10);
        assert_eq!(download.mime, "text/plain");
    }

    #[tokio::test]
    async fn test_fetch_unknown_extension_is_octet_stream() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.zzzunknown");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let Content::File(download) = fetch(&path).await.unwrap() else {
            panic!("expected a file download");
        };
        assert_eq!(download.mime, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_fetch_directory_is_unsupported() {
        let temp_dir = TempDir::new().unwrap();
        let result = fetch(temp_dir.path()).await.unwrap();
        assert!(matches!(result, Content::UnsupportedFolder));
    }

    #[tokio::test]
    async fn test_fetch_missing_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = fetch(&temp_dir.path().join("missing")).await;
        assert!(result.is_err());
    }
}
