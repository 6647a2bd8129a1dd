use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::resolver::Rejection;

/// Errors surfaced by the content endpoints.
///
/// Every variant is request-local; all of them render as plain text.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("FAILED")]
    Unauthorized,

    #[error("Missing 'location' arg.")]
    MissingArgument,

    #[error("Only relative paths are supported.")]
    AbsolutePathRejected,

    #[error("Not allowed.")]
    NotAllowed,

    #[error("Does not exist.")]
    NotFound,

    #[error("Not implemented.")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Rejection> for ContentError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingArgument => ContentError::MissingArgument,
            Rejection::AbsolutePathRejected => ContentError::AbsolutePathRejected,
            Rejection::NotAllowed => ContentError::NotAllowed,
            Rejection::NotFound => ContentError::NotFound,
        }
    }
}

impl ContentError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContentError::Unauthorized => StatusCode::UNAUTHORIZED,
            ContentError::MissingArgument => StatusCode::BAD_REQUEST,
            ContentError::AbsolutePathRejected | ContentError::NotAllowed => StatusCode::FORBIDDEN,
            ContentError::NotFound => StatusCode::NOT_FOUND,
            ContentError::Unsupported => StatusCode::NOT_IMPLEMENTED,
            ContentError::Io(err) => match err.kind() {
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        let status = self.status();

        // I/O details stay in the log, clients get the generic texts.
        let body = match &self {
            ContentError::Io(err) => match status {
                StatusCode::FORBIDDEN => ContentError::NotAllowed.to_string(),
                StatusCode::NOT_FOUND => ContentError::NotFound.to_string(),
                _ => {
                    error!("Unexpected filesystem error: {}", err);
                    "Internal server error.".to_string()
                }
            },
            other => other.to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
