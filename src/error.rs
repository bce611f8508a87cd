use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::handlers::TEXT_PLAIN_UTF8;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Path is outside root directory")]
    PathTraversal,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound(_) => StatusCode::NOT_FOUND,
            ServeError::PathTraversal => StatusCode::FORBIDDEN,
            ServeError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
            self.to_string(),
        )
            .into_response()
    }
}

/// Errors raised while loading the optional configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_path() {
        let err = ServeError::NotFound("/srv/share/missing.txt".to_string());
        assert_eq!(err.to_string(), "/srv/share/missing.txt not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(ServeError::PathTraversal.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServeError::InvalidPath("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ServeError::from(io).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_is_plain_text() {
        let response = ServeError::PathTraversal.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_PLAIN_UTF8
        );
    }
}
