//! Error types and HTTP error response handling.
//!
//! `AppError` covers storage and API failures and converts into a JSON
//! response for the authenticated API. `ProcessorError` is the
//! integration-level fault raised by a payment processor client; the
//! transaction service records it in the audit log and never lets it escape.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing API keys
/// - **Resource Errors**: Requested transaction or payment method not found
/// - **State Errors**: Transaction is not in a state that allows the operation
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Returns HTTP 500 with details hidden from the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Transaction does not exist or belongs to another API key.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Saved payment method does not exist, was deleted, or belongs to another user.
    #[error("Payment method not found")]
    PaymentMethodNotFound,

    /// The transaction has already moved past the state the operation needs.
    #[error("Transaction is not in a valid state for this operation")]
    InvalidTransactionState,

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidApiKey` → 401 Unauthorized
/// - `TransactionNotFound`, `PaymentMethodNotFound` → 404 Not Found
/// - `InvalidTransactionState` → 409 Conflict
/// - `InvalidRequest` → 400 Bad Request
/// - `Database` → 500 Internal Server Error
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::TransactionNotFound => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                self.to_string(),
            ),
            AppError::PaymentMethodNotFound => (
                StatusCode::NOT_FOUND,
                "payment_method_not_found",
                self.to_string(),
            ),
            AppError::InvalidTransactionState => (
                StatusCode::CONFLICT,
                "invalid_transaction_state",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Failure talking to the payment processor itself.
///
/// A processor that answers with `success: false` is not a `ProcessorError`;
/// that is a rejection carried in a `ProcessorReply`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Connection, TLS or timeout failure.
    #[error("Processor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The processor answered with something that is not a reply document.
    #[error("Invalid processor response: {0}")]
    InvalidResponse(String),

    /// Payload could not be built.
    #[error("Processor payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The processor client was configured with unusable settings.
    #[error("Invalid processor configuration: {0}")]
    InvalidConfig(String),
}
