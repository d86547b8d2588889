//! Transaction HTTP handlers.
//!
//! - POST /api/v1/transactions - Start a transaction
//! - GET /api/v1/transactions/{identifier} - Get transaction details
//! - GET /api/v1/transactions/{identifier}/messages - Audit trail

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        message::MessageResponse,
        transaction::{CreateTransactionRequest, Transaction, TransactionResponse},
    },
    services::return_url::{self, CallbackStatus},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

/// Longest return URL accepted.
const MAX_RETURN_URL_LEN: usize = 2048;

/// Start a new transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "return_url": "https://shop.example.com/order/42/complete"
/// }
/// ```
///
/// # Response (201)
///
/// The transaction with its `complete_url` and `cancel_url`, ready to hand
/// to the processor.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    if let Some(url) = &request.return_url {
        validate_return_url(url)?;
    }

    let transaction = Transaction::new(auth.api_key_id, request.return_url);
    state.store.ensure_transaction(&transaction).await?;

    tracing::info!(
        identifier = %transaction.identifier,
        business = %auth.business_name,
        "transaction created"
    );

    Ok((StatusCode::CREATED, Json(to_response(&state, transaction))))
}

/// Get a transaction by identifier.
///
/// Returns 404 if the transaction belongs to another API key.
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(identifier): Path<String>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = find_owned(&state, &auth, &identifier).await?;
    Ok(Json(to_response(&state, transaction)))
}

/// List the audit messages of a transaction, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(identifier): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let transaction = find_owned(&state, &auth, &identifier).await?;
    let messages = state.store.messages_for(transaction.id).await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Fetch a transaction, hiding ones owned by other API keys.
pub(crate) async fn find_owned(
    state: &AppState,
    auth: &AuthContext,
    identifier: &str,
) -> Result<Transaction, AppError> {
    state
        .store
        .find_transaction(identifier)
        .await?
        .filter(|t| t.owner_id == auth.api_key_id)
        .ok_or(AppError::TransactionNotFound)
}

fn to_response(state: &AppState, transaction: Transaction) -> TransactionResponse {
    let callback = |status| {
        return_url::callback_url(
            &state.config.base_url,
            &state.config.callback_prefix,
            &transaction.identifier,
            status,
            transaction.return_url.as_deref(),
        )
    };
    let complete_url = callback(CallbackStatus::Complete);
    let cancel_url = callback(CallbackStatus::Cancel);

    TransactionResponse::new(transaction, complete_url, cancel_url)
}

/// Return URLs must be site-relative paths or http(s) URLs.
fn validate_return_url(url: &str) -> Result<(), AppError> {
    if url.len() > MAX_RETURN_URL_LEN {
        return Err(AppError::InvalidRequest(format!(
            "return_url exceeds {MAX_RETURN_URL_LEN} characters"
        )));
    }
    if !return_url::is_redirectable(url) {
        return Err(AppError::InvalidRequest(
            "return_url must be a relative path or an http(s) URL".to_string(),
        ));
    }
    Ok(())
}
