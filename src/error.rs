use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::id::Id;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx answer from the remote API, carrying its `message` when present.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response payload: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("No active session")]
    NoSession,

    #[error("Unknown barangay: {0}")]
    UnknownBarangay(Id),

    #[error("{0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(Box::new(e))
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NoSession => StatusCode::UNAUTHORIZED,
            Error::UnknownBarangay(_) => StatusCode::NOT_FOUND,
            Error::Invalid(_) => StatusCode::BAD_REQUEST,
            // Client errors from the remote API are passed through as-is
            Error::Status { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Error::Transport(_) | Error::Malformed(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Json(_) | Error::Csv(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
