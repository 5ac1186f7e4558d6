use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors surfaced by the service layer.
///
/// Provider failures never appear here: adapters swallow them and contribute
/// no plans instead.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Rejected query parameters; the message is returned verbatim.
    #[error("{0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Store failure; aborts the whole sync transaction.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PricingError::InvalidQuery(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            PricingError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            PricingError::Database(e) => {
                tracing::error!(error = %e, "Database error while serving pricing request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            PricingError::Internal(e) => {
                tracing::error!(error = %e, "Internal error while serving pricing request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
