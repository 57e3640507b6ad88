use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by a single fetch cycle. All three are recovered at the
/// handler boundary and rendered as inline banners; none terminates the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Zero rows came back. Distinct from a transport error: surfaced as a
    /// warning and the previously fetched rows are kept.
    #[error("query returned no opportunities for the selected period")]
    Empty,

    /// Authentication or transport failure, message carried verbatim.
    #[error("{0}")]
    Remote(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        let status = match err {
            FetchError::InvalidRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FetchError::Empty => StatusCode::OK,
            FetchError::Remote(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
