//! Persistence port for transactions, messages and saved payment methods.
//!
//! Handlers and services only talk to `PaymentStore`. `PgPaymentStore`
//! backs the running service; `InMemoryPaymentStore` backs tests and local
//! runs without PostgreSQL.
//!
//! # Atomicity
//!
//! A processor operation first claims its transaction with
//! `claim_transaction`, which only one caller can win. Status changes are
//! conditional on the expected prior status and release the claim, so two
//! callbacks racing on the same transaction cannot both reach the processor.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::api_key::ApiKey;
use crate::models::message::{Message, NewMessage};
use crate::models::payment_method::{NewSavedPaymentMethod, SavedPaymentMethod};
use crate::models::transaction::{Transaction, TransactionStatus};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPaymentStore;
pub use postgres::PgPaymentStore;

/// Age after which a claim left by a crashed operation can be taken over.
///
/// Must stay above the processor timeout.
pub const CLAIM_TTL: Duration = Duration::from_secs(600);

/// The statuses in `expected` that are allowed to move to `next`.
pub(crate) fn transition_sources(
    expected: &[TransactionStatus],
    next: TransactionStatus,
) -> Vec<TransactionStatus> {
    expected
        .iter()
        .copied()
        .filter(|status| status.can_transition_to(next))
        .collect()
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;

    async fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError>;

    /// Insert the transaction unless a row with its id already exists.
    ///
    /// An existing row is left untouched; status changes go through
    /// `transition_status`.
    async fn ensure_transaction(&self, transaction: &Transaction) -> Result<(), AppError>;

    async fn find_transaction(&self, identifier: &str) -> Result<Option<Transaction>, AppError>;

    async fn find_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError>;

    async fn set_return_url(&self, id: Uuid, return_url: &str) -> Result<(), AppError>;

    /// Mark the transaction as held by a processor operation, if its status
    /// is one of `expected` and no live claim exists.
    ///
    /// Returns `false` when another operation holds it or the status moved on.
    async fn claim_transaction(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
    ) -> Result<bool, AppError>;

    /// Drop a claim without changing the status.
    async fn release_claim(&self, id: Uuid) -> Result<(), AppError>;

    /// Move the transaction to `next` only if its current status is one of
    /// `expected` and that move is allowed. Releases any claim.
    ///
    /// Returns `false` when the status had already moved on.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
        next: TransactionStatus,
    ) -> Result<bool, AppError>;

    /// Store a tokenized card, link it to its transaction and move that
    /// transaction from `Created` to `Complete`, all or nothing. Releases
    /// any claim.
    ///
    /// Returns `None` if the transaction was no longer `Created`.
    async fn attach_payment_method(
        &self,
        method: NewSavedPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, AppError>;

    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Messages for a transaction, oldest first.
    async fn messages_for(&self, transaction_id: Uuid) -> Result<Vec<Message>, AppError>;

    /// Active payment method owned by `user_id`.
    async fn find_payment_method(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethod>, AppError>;

    async fn list_payment_methods(&self, user_id: Uuid)
    -> Result<Vec<SavedPaymentMethod>, AppError>;

    async fn rename_payment_method(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<Option<SavedPaymentMethod>, AppError>;

    /// Soft delete. Returns `false` if the method was already inactive or missing.
    async fn deactivate_payment_method(&self, id: Uuid) -> Result<bool, AppError>;
}
