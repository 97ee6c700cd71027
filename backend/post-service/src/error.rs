/// Error types for post-service
///
/// Errors are converted to `tonic::Status` for gRPC callers and to JSON
/// responses for the HTTP surface.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Result type for post-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator (database, graph lookup) could not serve the request.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Media storage error: {0}")]
    Media(String),

    #[error("Payment gateway error: {0}")]
    Payment(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert AppError to tonic::Status for gRPC responses
impl From<AppError> for tonic::Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => tonic::Status::invalid_argument(msg),
            AppError::NotFound(msg) => tonic::Status::not_found(msg),
            AppError::Unavailable(msg) => {
                tracing::warn!("Upstream unavailable: {}", msg);
                tonic::Status::unavailable(msg)
            }
            AppError::Conflict(msg) => tonic::Status::already_exists(msg),
            AppError::Payment(msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                tonic::Status::internal(format!("Payment failed: {}", msg))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                tonic::Status::internal("Database operation failed")
            }
            AppError::Media(msg) => {
                tracing::error!("Media storage error: {}", msg);
                tonic::Status::internal("Media storage operation failed")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                tonic::Status::internal("Internal server error")
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Media(_)
            | AppError::Payment(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        HttpResponse::build(status).json(serde_json::json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
        }))
    }
}
