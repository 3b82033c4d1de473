use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snip_shortener::ShortenerError;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("URL was deleted")]
    Gone,
    #[error("{0}")]
    Unavailable(String),
    #[error("internal server error")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(err: impl Display) -> Self {
        AppError::BadRequest(err.to_string())
    }

    pub fn internal(err: impl Display) -> Self {
        AppError::Internal(err.to_string())
    }

    /// Mapping used by the redirect route: tombstones are 410, the rest 400.
    pub fn from_decode(err: ShortenerError) -> Self {
        match err {
            ShortenerError::UrlDeleted(_) => AppError::Gone,
            other => AppError::bad_request(other),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Gone => StatusCode::GONE,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(error = %detail, "request failed");
        }
        (self.status(), self.to_string()).into_response()
    }
}
