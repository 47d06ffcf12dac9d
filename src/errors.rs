use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the record store and survey blob.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("stored data could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no log recorded for {0}")]
    LogNotFound(NaiveDate),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
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

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(message) => Self::bad_request(message),
            StoreError::LogNotFound(_) => Self::not_found(err.to_string()),
            other => Self::internal(other),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status_codes() {
        let invalid: AppError = StoreError::invalid("goal must be between 1 and 100").into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message, "goal must be between 1 and 100");

        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let missing: AppError = StoreError::LogNotFound(date).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert!(missing.message.contains("2026-03-01"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let unavailable: AppError = StoreError::from(io).into();
        assert_eq!(unavailable.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(unavailable.message.starts_with("storage unavailable"));
    }
}
