//! API key authentication middleware.
//!
//! This middleware intercepts every management API request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists and is active
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! Processor callbacks are not behind this middleware; they are matched by
//! the unguessable transaction identifier instead.

use crate::{AppState, error::AppError, models::api_key::ApiKey};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// `api_key_id` is the owner of every transaction and saved payment method
/// created through the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub api_key_id: Uuid,
    pub business_name: String,
}

/// API key authentication middleware function.
///
/// # Headers
///
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler if the key is valid
/// - `Err(AppError::InvalidApiKey)` otherwise (401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidApiKey)?;

    let api_key_record = state
        .store
        .find_active_api_key(&ApiKey::hash_key(api_key))
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    request.extensions_mut().insert(AuthContext {
        api_key_id: api_key_record.id,
        business_name: api_key_record.business_name,
    });

    Ok(next.run(request).await)
}
