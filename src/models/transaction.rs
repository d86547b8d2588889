//! Payment transaction models and API request/response types.
//!
//! - `Transaction`: a locally tracked payment attempt against the processor
//! - `TransactionStatus`: the forward-only status machine
//! - `CreateTransactionRequest` / `TransactionResponse`: API bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of random bytes behind a transaction identifier (30 hex chars).
const IDENTIFIER_BYTES: usize = 15;

/// Lifecycle status of a transaction.
///
/// Status only moves forward:
///
/// - `Created` → `Pending`, `Complete`, `Cancelled`, `Error`
/// - `Pending` → `Complete`, `Cancelled`, `Error`
/// - `Complete`, `Cancelled`, `Error` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Created,
    Pending,
    Complete,
    Cancelled,
    Error,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "created",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Complete => "complete",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Complete | TransactionStatus::Cancelled | TransactionStatus::Error
        )
    }

    /// Whether moving from `self` to `next` respects the forward-only rule.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        match self {
            TransactionStatus::Created => next != TransactionStatus::Created,
            TransactionStatus::Pending => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, UnknownStatus> {
        match value.as_str() {
            "created" => Ok(TransactionStatus::Created),
            "pending" => Ok(TransactionStatus::Pending),
            "complete" => Ok(TransactionStatus::Complete),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            "error" => Ok(TransactionStatus::Error),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// A status string read from storage that is not a known status.
#[derive(Debug, thiserror::Error)]
#[error("unknown transaction status `{0}`")]
pub struct UnknownStatus(pub String);

/// Represents a payment transaction record.
///
/// # Database Table
///
/// Maps to the `payment_transactions` table. Each transaction:
/// - Carries an opaque `identifier` the processor echoes back in callbacks
/// - Belongs to the API key that started it (`owner_id`)
/// - Optionally links to the saved payment method it produced
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Storage key
    pub id: Uuid,

    /// Correlation identifier shared with the processor
    pub identifier: String,

    /// API key (business) that created this transaction
    pub owner_id: Uuid,

    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,

    /// Where the end user is sent once processing finishes
    pub return_url: Option<String>,

    /// Saved payment method produced by a successful tokenization
    pub saved_method_id: Option<Uuid>,

    /// Set while a processor operation holds the transaction
    #[serde(skip)]
    pub processing_since: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a new, not yet persisted, transaction in the `Created` state.
    pub fn new(owner_id: Uuid, return_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            identifier: generate_identifier(),
            owner_id,
            status: TransactionStatus::Created,
            return_url,
            saved_method_id: None,
            processing_since: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Random correlation identifier, hex encoded.
fn generate_identifier() -> String {
    let bytes: [u8; IDENTIFIER_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Request to start a new transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "return_url": "https://shop.example.com/order/42/complete"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub return_url: Option<String>,
}

/// Response returned for transaction endpoints.
///
/// Includes the URLs the processor should be told to call back.
///
/// # JSON Example
///
/// ```json
/// {
///   "identifier": "3f9a0c...",
///   "status": "created",
///   "return_url": "https://shop.example.com/order/42/complete",
///   "saved_method_id": null,
///   "complete_url": "https://pay.example.com/paymentendpoint/3f9a0c.../complete/aHR0...",
///   "cancel_url": "https://pay.example.com/paymentendpoint/3f9a0c.../cancel/aHR0...",
///   "created_at": "2025-12-21T16:00:00Z",
///   "updated_at": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub identifier: String,
    pub status: TransactionStatus,
    pub return_url: Option<String>,
    pub saved_method_id: Option<Uuid>,
    pub complete_url: String,
    pub cancel_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionResponse {
    /// Build the response, attaching the callback URLs for this transaction.
    pub fn new(transaction: Transaction, complete_url: String, cancel_url: String) -> Self {
        Self {
            identifier: transaction.identifier,
            status: transaction.status,
            return_url: transaction.return_url,
            saved_method_id: transaction.saved_method_id,
            complete_url,
            cancel_url,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}
