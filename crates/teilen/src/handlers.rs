use axum::{
    Json,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::AppState;
use crate::error::ContentError;
use crate::fetch::{self, Content};
use crate::listing::{self, DirEntry};

/// Name of the query parameter carrying the requested location
pub const LOCATION_PARAM: &str = "location";

/// First value of `name` in a raw query string, form-decoded once.
///
/// Repeated parameters are not an error; later values are ignored.
pub fn first_query_value(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = form_decode(parts.next()?);
        (key == name).then(|| form_decode(parts.next().unwrap_or("")))
    })
}

fn form_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Response for the configuration endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResponse {
    pub password_required: bool,
}

fn plain_text(body: &'static str) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// GET /ping
pub async fn ping() -> Response {
    plain_text("pong")
}

/// GET /version
pub async fn version() -> Response {
    plain_text(env!("CARGO_PKG_VERSION"))
}

/// GET /configuration - Tell clients whether a password is needed
pub async fn get_configuration(State(state): State<AppState>) -> Json<ConfigurationResponse> {
    Json(ConfigurationResponse {
        password_required: state.password.is_some(),
    })
}

/// GET /login - Only reachable past the auth middleware
pub async fn get_login() -> Response {
    plain_text("OK")
}

/// GET /contents - List a directory, the shared root by default
pub async fn get_contents(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<DirEntry>>, ContentError> {
    let location = first_query_value(query.as_deref(), LOCATION_PARAM);
    let dir = state.resolver().resolve_directory(location.as_deref())?;

    debug!("Listing contents of {}", dir.display());

    let root = state.root_dir.clone();
    let entries = tokio::task::spawn_blocking(move || listing::list_contents(&root, &dir))
        .await
        .map_err(|err| ContentError::Io(std::io::Error::other(err.to_string())))??;

    Ok(Json(entries))
}

/// GET /content - Download a single file
///
/// Folders would have to be archived first and answer 501.
pub async fn get_content(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ContentError> {
    let location = first_query_value(query.as_deref(), LOCATION_PARAM);
    let path = state.resolver().resolve_entry(location.as_deref())?;

    match fetch::fetch(&path).await? {
        Content::File(download) => Ok(download.into_response()),
        Content::UnsupportedFolder => Err(ContentError::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_query_value() {
        assert_eq!(first_query_value(None, "location"), None);
        assert_eq!(first_query_value(Some(""), "location"), None);
        assert_eq!(first_query_value(Some("other=1"), "location"), None);
        assert_eq!(
            first_query_value(Some("location=a.txt"), "location").as_deref(),
            Some("a.txt")
        );
        assert_eq!(
            first_query_value(Some("location="), "location").as_deref(),
            Some("")
        );
        assert_eq!(
            first_query_value(Some("location"), "location").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_repeated_location_takes_first() {
        assert_eq!(
            first_query_value(Some("location=a.txt&location=sub"), "location").as_deref(),
            Some("a.txt")
        );
        assert_eq!(
            first_query_value(Some("x=1&location=sub&location=a.txt"), "location").as_deref(),
            Some("sub")
        );
    }

    #[test]
    fn test_query_value_decoded_once() {
        assert_eq!(
            first_query_value(Some("location=sub%252Fb.txt"), "location").as_deref(),
            Some("sub%2Fb.txt")
        );
        assert_eq!(
            first_query_value(Some("location=my+file.txt"), "location").as_deref(),
            Some("my file.txt")
        );
    }
}
