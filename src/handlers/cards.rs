//! Saved card HTTP handlers.
//!
//! - POST /api/v1/transactions/{identifier}/cards - Tokenize and save a card
//! - GET /api/v1/cards - List saved cards
//! - PUT /api/v1/cards/{id} - Update a saved card
//! - DELETE /api/v1/cards/{id} - Delete a saved card

use crate::{
    AppState,
    error::AppError,
    handlers::transactions::find_owned,
    middleware::auth::AuthContext,
    models::{
        gateway_response::GatewayResponseBody,
        payment_method::{CardData, PaymentMethodResponse, UpdateCardRequest},
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

/// Tokenize a card for a transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "number": "4242 4242 4242 4242",
///   "expiry_month": 12,
///   "expiry_year": 2030,
///   "cvv": "123"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "message": "Card created successfully",
///   "redirect_url": "https://shop.example.com/order/42/complete",
///   "payment_method": { "id": "...", "last_four_digits": "4242", "name": "************4242", ... }
/// }
/// ```
///
/// A declined card is still a 200 with `success: false`. A transaction that
/// is no longer `created` returns 409.
pub async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(identifier): Path<String>,
    Json(card): Json<CardData>,
) -> Result<Json<GatewayResponseBody>, AppError> {
    card.validate()?;

    let mut transaction = find_owned(&state, &auth, &identifier).await?;

    let response = state
        .service
        .create_card(&mut transaction, &card, auth.api_key_id)
        .await?
        .ok_or(AppError::InvalidTransactionState)?;

    Ok(Json(response.into()))
}

/// List active saved cards, newest first.
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PaymentMethodResponse>>, AppError> {
    let methods = state.store.list_payment_methods(auth.api_key_id).await?;

    Ok(Json(methods.into_iter().map(Into::into).collect()))
}

/// Update a saved card.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Travel card",
///   "expiry_month": 6,
///   "expiry_year": 2031
/// }
/// ```
pub async fn update_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<GatewayResponseBody>, AppError> {
    request.validate()?;

    let method = state
        .store
        .find_payment_method(id, auth.api_key_id)
        .await?
        .ok_or(AppError::PaymentMethodNotFound)?;

    let response = state.service.update_card(&method, &request).await?;

    Ok(Json(response.into()))
}

/// Delete a saved card (soft delete once the processor confirms).
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<GatewayResponseBody>, AppError> {
    let method = state
        .store
        .find_payment_method(id, auth.api_key_id)
        .await?
        .ok_or(AppError::PaymentMethodNotFound)?;

    let response = state.service.delete_card(&method).await?;

    Ok(Json(response.into()))
}
