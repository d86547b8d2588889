//! Processor callback endpoint.
//!
//! `/{callback_prefix}/{identifier}/{status}[/{return_url}]`
//!
//! The processor (or the user's browser, redirected by it) lands here once
//! it is done. Every outcome is a redirect: processors expect a redirect or
//! a 2xx, and an unknown identifier must look the same as any other miss.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::AppState;
use crate::models::transaction::TransactionStatus;
use crate::services::return_url::{self, CallbackStatus};

/// Callback without a return URL segment.
pub async fn handle_callback(
    State(state): State<AppState>,
    Path((identifier, status)): Path<(String, String)>,
) -> Redirect {
    process_callback(&state, &identifier, &status, None).await
}

/// Callback carrying an encoded return URL.
pub async fn handle_callback_with_return(
    State(state): State<AppState>,
    Path((identifier, status, encoded)): Path<(String, String, String)>,
) -> Redirect {
    process_callback(&state, &identifier, &status, Some(&encoded)).await
}

fn decode_return_url(encoded: &str) -> Option<String> {
    match return_url::decode(encoded) {
        Ok(url) if return_url::is_redirectable(&url) => Some(url),
        Ok(url) => {
            tracing::warn!(return_url = %url, "refusing to redirect to return URL");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "undecodable return URL");
            None
        }
    }
}

async fn process_callback(
    state: &AppState,
    identifier: &str,
    status: &str,
    encoded_return_url: Option<&str>,
) -> Redirect {
    let base_url = state.config.base_url.as_str();

    let Some(status) = CallbackStatus::parse(status) else {
        tracing::warn!(identifier, status, "unknown callback status");
        return Redirect::to(base_url);
    };

    let return_url = encoded_return_url.and_then(decode_return_url);

    let mut transaction = match state.store.find_transaction(identifier).await {
        Ok(Some(transaction)) => transaction,
        Ok(None) => {
            tracing::info!(identifier, "callback for unknown transaction");
            return Redirect::to(base_url);
        }
        Err(e) => {
            tracing::error!(identifier, error = %e, "transaction lookup failed");
            return Redirect::to(base_url);
        }
    };

    // Replayed callback: nothing left to do
    if transaction.status == TransactionStatus::Complete {
        tracing::debug!(identifier, "callback for completed transaction");
        return Redirect::to(return_url.as_deref().unwrap_or(base_url));
    }

    if let Some(url) = &return_url {
        if let Err(e) = state.store.set_return_url(transaction.id, url).await {
            tracing::error!(identifier, error = %e, "failed to store return URL");
            return Redirect::to(base_url);
        }
        transaction.return_url = Some(url.clone());
    }

    match status {
        CallbackStatus::Complete => match state.service.complete_purchase(&mut transaction).await {
            Ok(Some(response)) => Redirect::to(&response.redirect_url),
            Ok(None) => Redirect::to(&state.service.redirect_url(&transaction)),
            Err(e) => {
                tracing::error!(identifier, error = %e, "purchase completion failed");
                Redirect::to(base_url)
            }
        },
        CallbackStatus::Cancel => {
            // TODO: record the cancellation (Created/Pending -> Cancelled) once checkout can resume a cancelled transaction
            tracing::warn!(
                identifier,
                status = %transaction.status,
                "cancel callback received, transaction status left unchanged"
            );
            Redirect::to(&state.config.checkout_url)
        }
    }
}
