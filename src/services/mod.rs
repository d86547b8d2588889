//! Business logic services.
//!
//! Services hold the payment flow separated from HTTP handlers.

pub mod return_url;
pub mod transaction_service;
