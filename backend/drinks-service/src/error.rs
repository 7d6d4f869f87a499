/// Error types for Drinks Service
///
/// Every failure leaving a handler is an `AppError`. Errors render as
/// `{"success": false, "error": <status>, "message": <text>}`; authorization
/// failures also carry the gate's machine-readable `code`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use auth_gate::AuthError;
use thiserror::Error;
use tracing::error;

/// Result type for drinks-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Request denied by the authorization gate
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Malformed or incomplete request
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Known path, unsupported method
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Request body over the size limit (bytes)
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Well-formed request with invalid field values
    #[error("{0}")]
    Unprocessable(String),

    /// Conflict (duplicate title)
    #[error("{0}")]
    Conflict(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message shown to API clients. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.public_message(),
        });

        if let AppError::Auth(e) = self {
            body["code"] = serde_json::Value::from(e.code());
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("a drink with this title already exists".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Unprocessable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("invalid JSON body: {}", err))
    }
}
