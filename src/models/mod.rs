//! Data models representing stored entities and API bodies.

/// API key authentication model
pub mod api_key;
/// Processor operation outcome
pub mod gateway_response;
/// Audit trail messages
pub mod message;
/// Saved payment methods and card input
pub mod payment_method;
/// Payment transactions and their status machine
pub mod transaction;
