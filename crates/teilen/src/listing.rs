use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::resolver::is_within;

/// One record of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DirEntry {
    Folder {
        name: String,
        /// Seconds since the Unix epoch
        mtime: f64,
    },
    File {
        name: String,
        mtime: f64,
        size: u64,
    },
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            DirEntry::Folder { name, .. } | DirEntry::File { name, .. } => name,
        }
    }
}

/// Signed seconds relative to the Unix epoch; 0 when the platform has no mtime.
fn mtime_secs(modified: std::io::Result<SystemTime>) -> f64 {
    match modified.map(|t| t.duration_since(UNIX_EPOCH)) {
        Ok(Ok(after)) => after.as_secs_f64(),
        Ok(Err(before)) => -before.duration().as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// List the immediate children of `dir`, folders first, each group sorted by name.
///
/// Metadata follows symlinks. Children that are neither files nor directories,
/// and links whose target lies outside `root`, are left out.
pub fn list_contents(root: &Path, dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let is_link = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        if is_link {
            match path.canonicalize() {
                Ok(target) if is_within(root, &target) => {}
                _ => {
                    debug!("Skipping link leaving the share: {}", path.display());
                    continue;
                }
            }
        }

        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        let mtime = mtime_secs(metadata.modified());

        if metadata.is_dir() {
            folders.push(DirEntry::Folder { name, mtime });
        } else if metadata.is_file() {
            files.push(DirEntry::File {
                name,
                mtime,
                size: metadata.len(),
            });
        }
    }

    folders.sort_by(|a, b| a.name().cmp(b.name()));
    files.sort_by(|a, b| a.name().cmp(b.name()));
    folders.extend(files);
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, std::path::PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::write(root.join("a.txt"), "0123456789").unwrap();
        fs::write(root.join("c.bin"), [0u8; 3]).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::create_dir(root.join("docs")).unwrap();
        fs::write(root.join("sub").join("nested.txt"), "nested").unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_folders_first_sorted() {
        let (_guard, root) = fixture();
        let entries = list_contents(&root, &root).unwrap();

        let names: Vec<&str> = entries.iter().map(DirEntry::name).collect();
        assert_eq!(names, vec!["docs", "sub", "a.txt", "c.bin"]);
        assert!(matches!(entries[0], DirEntry::Folder { .. }));
        assert!(matches!(entries[1], DirEntry::Folder { .. }));
        assert!(matches!(entries[2], DirEntry::File { .. }));
    }

    #[test]
    fn test_counts_and_sizes() {
        let (_guard, root) = fixture();
        let entries = list_contents(&root, &root).unwrap();
        assert_eq!(entries.len(), 4);

        let sizes: Vec<u64> = entries
            .iter()
            .filter_map(|e| match e {
                DirEntry::File { size, .. } => Some(*size),
                DirEntry::Folder { .. } => None,
            })
            .collect();
        assert_eq!(sizes, vec![10, 3]);
    }

    #[test]
    fn test_no_recursion() {
        let (_guard, root) = fixture();
        let entries = list_contents(&root, &root).unwrap();
        assert!(entries.iter().all(|e| e.name() != "nested.txt"));

        let nested = list_contents(&root, &root.join("sub")).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name(), "nested.txt");
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        assert!(list_contents(&root, &root).unwrap().is_empty());
    }

    #[test]
    fn test_mtime_before_epoch_is_negative() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(mtime_secs(Ok(before)), -10.0);

        let after = UNIX_EPOCH + Duration::from_millis(1500);
        assert_eq!(mtime_secs(Ok(after)), 1.5);

        let unsupported = std::io::Error::from(std::io::ErrorKind::Unsupported);
        assert_eq!(mtime_secs(Err(unsupported)), 0.0);
    }

    #[test]
    fn test_serialization_shape() {
        let folder = DirEntry::Folder {
            name: "sub".to_string(),
            mtime: 1.5,
        };
        let file = DirEntry::File {
            name: "a.txt".to_string(),
            mtime: 2.0,
            size: 10,
        };
        assert_eq!(
            serde_json::to_value(&folder).unwrap(),
            json!({"type": "folder", "name": "sub", "mtime": 1.5})
        );
        assert_eq!(
            serde_json::to_value(&file).unwrap(),
            json!({"type": "file", "name": "a.txt", "mtime": 2.0, "size": 10})
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_links_outside_root_are_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().canonicalize().unwrap();
        let root = base.join("share");
        fs::create_dir(&root).unwrap();
        fs::write(base.join("secret.txt"), "secret").unwrap();
        fs::write(root.join("visible.txt"), "hi").unwrap();
        std::os::unix::fs::symlink(base.join("secret.txt"), root.join("leak.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("visible.txt"), root.join("alias.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling")).unwrap();

        let entries = list_contents(&root, &root).unwrap();
        let names: Vec<&str> = entries.iter().map(DirEntry::name).collect();
        assert_eq!(names, vec!["alias.txt", "visible.txt"]);
    }

    #[test]
    fn test_missing_directory_errors() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_contents(temp_dir.path(), &temp_dir.path().join("nope"));
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }
}
