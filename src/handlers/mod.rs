//! HTTP request handlers (route handlers).

/// Processor callback endpoint
pub mod callback;
/// Saved card management
pub mod cards;
/// Service health
pub mod health;
/// Transaction management and audit trail
pub mod transactions;
