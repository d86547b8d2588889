//! Payment endpoint service.
//!
//! Tracks payment transactions run against an external processor, receives
//! the processor's callbacks, and keeps an audit trail of every request and
//! response exchanged.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum
//! - **Database**: PostgreSQL with sqlx, behind the `PaymentStore` port
//! - **Processor**: JSON-over-HTTP client or mock, behind the `PaymentProcessor` port
//! - **Authentication**: API key with SHA-256 hashing for the management API
//!
//! # Routes
//!
//! - `GET|POST /{callback_prefix}/{identifier}/{status}[/{return_url}]` - processor callbacks
//! - `/api/v1/...` - authenticated management API
//! - `GET /health`

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod processor;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ProcessorError;
use crate::processor::{HttpProcessor, MockBehavior, MockProcessor, PaymentProcessor};
use crate::services::transaction_service::TransactionService;
use crate::store::PaymentStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PaymentStore>,
    pub service: TransactionService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PaymentStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let service = TransactionService::new(store.clone(), processor, config.base_url.clone());
        Self {
            config: Arc::new(config),
            store,
            service,
        }
    }
}

/// Pick the processor client the configuration asks for.
pub fn processor_from_config(config: &Config) -> Result<Arc<dyn PaymentProcessor>, ProcessorError> {
    match &config.processor_url {
        Some(url) => Ok(Arc::new(HttpProcessor::new(
            url,
            config.processor_api_key.clone(),
            Duration::from_secs(config.processor_timeout_secs),
        )?)),
        None => Ok(Arc::new(MockProcessor::new(MockBehavior::from_name(
            &config.mock_processor_behavior,
        )))),
    }
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.callback_prefix.trim_matches('/').to_string();

    let authenticated_routes = Router::new()
        .route(
            "/api/v1/transactions",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/v1/transactions/{identifier}",
            get(handlers::transactions::get_transaction),
        )
        .route(
            "/api/v1/transactions/{identifier}/messages",
            get(handlers::transactions::list_messages),
        )
        .route(
            "/api/v1/transactions/{identifier}/cards",
            post(handlers::cards::create_card),
        )
        .route("/api/v1/cards", get(handlers::cards::list_cards))
        .route(
            "/api/v1/cards/{id}",
            put(handlers::cards::update_card).delete(handlers::cards::delete_card),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Processors call back with redirects (GET) or server-to-server requests (POST)
    let callback_routes = Router::new()
        .route(
            &format!("/{prefix}/{{identifier}}/{{status}}"),
            get(handlers::callback::handle_callback).post(handlers::callback::handle_callback),
        )
        .route(
            &format!("/{prefix}/{{identifier}}/{{status}}/{{return_url}}"),
            get(handlers::callback::handle_callback_with_return)
                .post(handlers::callback::handle_callback_with_return),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(callback_routes)
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
