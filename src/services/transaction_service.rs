//! Transaction service - runs processor operations for a transaction.
//!
//! Every operation follows the same shape:
//!
//! 1. Check the transaction is in a state the operation applies to
//! 2. Store the transaction and claim it, so only one operation runs at a time
//! 3. Write a `*Request` message
//! 4. Call the processor
//! 5. Write exactly one `*Response` or `*Error` message
//! 6. Apply the status change with a conditional update
//!
//! A processor that declines and a processor that cannot be reached end
//! the same way for the caller: a failed `GatewayResponse`. The audit log
//! tells them apart through the error payload.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, ProcessorError};
use crate::models::gateway_response::GatewayResponse;
use crate::models::message::{MessageKind, NewMessage};
use crate::models::payment_method::{
    CardData, NewSavedPaymentMethod, SavedPaymentMethod, UpdateCardRequest,
};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::processor::{PaymentProcessor, ProcessorReply};
use crate::store::PaymentStore;

/// Statuses a purchase can still be completed from.
const COMPLETABLE: [TransactionStatus; 2] = [TransactionStatus::Created, TransactionStatus::Pending];

/// How a processor call ended.
enum Outcome {
    Approved(ProcessorReply),
    Declined(ProcessorReply),
    Fault(String),
}

impl Outcome {
    fn from_result(result: Result<ProcessorReply, ProcessorError>) -> Self {
        match result {
            Ok(reply) if reply.success => Outcome::Approved(reply),
            Ok(reply) => Outcome::Declined(reply),
            Err(e) => Outcome::Fault(e.to_string()),
        }
    }

    fn error_payload(&self) -> serde_json::Value {
        match self {
            Outcome::Approved(reply) | Outcome::Declined(reply) => reply_payload(reply),
            Outcome::Fault(message) => json!({ "fault": true, "message": message }),
        }
    }

    /// Text for the caller when the operation did not succeed.
    fn failure_text(&self) -> String {
        match self {
            Outcome::Approved(reply) | Outcome::Declined(reply) => reply.failure_text(),
            Outcome::Fault(message) => message.clone(),
        }
    }
}

fn reply_payload(reply: &ProcessorReply) -> serde_json::Value {
    json!({
        "fault": false,
        "success": reply.success,
        "reference": reply.reference,
        "code": reply.code,
        "message": reply.message,
    })
}

#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn PaymentStore>,
    processor: Arc<dyn PaymentProcessor>,
    base_url: String,
}

impl TransactionService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        processor: Arc<dyn PaymentProcessor>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            processor,
            base_url: base_url.into(),
        }
    }

    /// Where the user goes after an operation on `transaction`.
    pub fn redirect_url(&self, transaction: &Transaction) -> String {
        transaction
            .return_url
            .clone()
            .unwrap_or_else(|| self.base_url.clone())
    }

    async fn record(
        &self,
        transaction_id: Uuid,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        self.store
            .save_message(NewMessage::new(transaction_id, kind, payload))
            .await?;
        Ok(())
    }

    /// Claim `transaction` for a processor operation.
    ///
    /// Stores the transaction first if it is new. Returns `false` when the
    /// status is not in `expected` or another operation already holds it.
    async fn claim(
        &self,
        transaction: &Transaction,
        expected: &[TransactionStatus],
    ) -> Result<bool, AppError> {
        self.store.ensure_transaction(transaction).await?;
        let claimed = self.store.claim_transaction(transaction.id, expected).await?;
        if !claimed {
            tracing::info!(
                identifier = %transaction.identifier,
                "transaction already being processed or settled"
            );
        }
        Ok(claimed)
    }

    /// Give the claim back when an operation stops on a storage error.
    async fn release_on_error<T>(
        &self,
        transaction_id: Uuid,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        if result.is_err() {
            let released = self.store.release_claim(transaction_id).await;
            if let Err(e) = released {
                tracing::error!(%transaction_id, error = %e, "failed to release claim");
            }
        }
        result
    }

    /// Tokenize a card and save it for `user_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` if the transaction is not `Created` or another request
    ///   is already working on it (nothing is written)
    /// - `Ok(Some(response))` otherwise, successful or not
    ///
    /// # Errors
    ///
    /// Only storage failures. Processor failures end up in the response.
    pub async fn create_card(
        &self,
        transaction: &mut Transaction,
        card: &CardData,
        user_id: Uuid,
    ) -> Result<Option<GatewayResponse>, AppError> {
        if transaction.status != TransactionStatus::Created {
            tracing::debug!(
                identifier = %transaction.identifier,
                status = %transaction.status,
                "create_card skipped, transaction not in created state"
            );
            return Ok(None);
        }

        // Stored before the processor call so the messages below always have a parent
        if !self.claim(transaction, &[TransactionStatus::Created]).await? {
            return Ok(None);
        }

        let result = self.tokenize(transaction, card, user_id).await;
        self.release_on_error(transaction.id, result).await
    }

    async fn tokenize(
        &self,
        transaction: &mut Transaction,
        card: &CardData,
        user_id: Uuid,
    ) -> Result<Option<GatewayResponse>, AppError> {
        self.record(
            transaction.id,
            MessageKind::CreateCardRequest,
            card.audit_payload(),
        )
        .await?;

        let outcome = match Outcome::from_result(self.processor.create_card(card).await) {
            Outcome::Approved(reply) if reply.reference.is_none() => Outcome::Fault(
                "processor approved the card without returning a reference".to_string(),
            ),
            outcome => outcome,
        };
        let redirect_url = self.redirect_url(transaction);

        let reply = match outcome {
            Outcome::Approved(reply) => reply,
            failed => {
                self.record(
                    transaction.id,
                    MessageKind::CreateCardError,
                    failed.error_payload(),
                )
                .await?;
                self.mark_failed(transaction, &[TransactionStatus::Created])
                    .await?;

                tracing::warn!(
                    identifier = %transaction.identifier,
                    reason = %failed.failure_text(),
                    "card tokenization failed"
                );
                return Ok(Some(GatewayResponse::failure(
                    failed.failure_text(),
                    redirect_url,
                )));
            }
        };

        self.record(
            transaction.id,
            MessageKind::CreateCardResponse,
            reply_payload(&reply),
        )
        .await?;

        let method = NewSavedPaymentMethod {
            id: Uuid::new_v4(),
            card_reference: reply.reference.clone().unwrap_or_default(),
            last_four_digits: card.last_four_digits(),
            name: card.display_name(),
            user_id,
            transaction_id: transaction.id,
        };

        // Only a claim gone stale mid-call lets another request move the status
        let Some(saved) = self.store.attach_payment_method(method).await? else {
            tracing::warn!(
                identifier = %transaction.identifier,
                "transaction moved on while the card was being tokenized"
            );
            return Ok(None);
        };

        transaction.status = TransactionStatus::Complete;
        transaction.saved_method_id = Some(saved.id);

        tracing::info!(
            identifier = %transaction.identifier,
            payment_method_id = %saved.id,
            "card saved"
        );

        Ok(Some(
            GatewayResponse::success("Card created successfully", redirect_url)
                .with_saved_method(saved),
        ))
    }

    /// Finish the purchase tracked by `transaction`.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` if the transaction is not `Created` or `Pending`, or if a
    ///   concurrent completion holds or already settled it
    /// - `Ok(Some(response))` otherwise
    pub async fn complete_purchase(
        &self,
        transaction: &mut Transaction,
    ) -> Result<Option<GatewayResponse>, AppError> {
        if !COMPLETABLE.contains(&transaction.status) {
            return Ok(None);
        }

        if !self.claim(transaction, &COMPLETABLE).await? {
            return Ok(None);
        }

        let result = self.capture(transaction).await;
        self.release_on_error(transaction.id, result).await
    }

    async fn capture(
        &self,
        transaction: &mut Transaction,
    ) -> Result<Option<GatewayResponse>, AppError> {
        self.record(
            transaction.id,
            MessageKind::CompletePurchaseRequest,
            json!({ "identifier": transaction.identifier }),
        )
        .await?;

        let outcome = Outcome::from_result(
            self.processor
                .complete_purchase(&transaction.identifier)
                .await,
        );
        let redirect_url = self.redirect_url(transaction);

        match outcome {
            Outcome::Approved(reply) => {
                self.record(
                    transaction.id,
                    MessageKind::CompletePurchaseResponse,
                    reply_payload(&reply),
                )
                .await?;

                let completed = self
                    .store
                    .transition_status(transaction.id, &COMPLETABLE, TransactionStatus::Complete)
                    .await?;
                if !completed {
                    tracing::warn!(
                        identifier = %transaction.identifier,
                        "purchase settled elsewhere while the processor was working"
                    );
                    return Ok(None);
                }
                transaction.status = TransactionStatus::Complete;

                tracing::info!(identifier = %transaction.identifier, "purchase completed");
                Ok(Some(GatewayResponse::success(
                    "Payment completed successfully",
                    redirect_url,
                )))
            }
            failed => {
                self.record(
                    transaction.id,
                    MessageKind::CompletePurchaseError,
                    failed.error_payload(),
                )
                .await?;
                self.mark_failed(transaction, &COMPLETABLE).await?;

                tracing::warn!(
                    identifier = %transaction.identifier,
                    reason = %failed.failure_text(),
                    "purchase completion failed"
                );
                Ok(Some(GatewayResponse::failure(
                    failed.failure_text(),
                    redirect_url,
                )))
            }
        }
    }

    /// Update a saved card at the processor, renaming it locally on success.
    pub async fn update_card(
        &self,
        method: &SavedPaymentMethod,
        data: &UpdateCardRequest,
    ) -> Result<GatewayResponse, AppError> {
        self.record(
            method.transaction_id,
            MessageKind::UpdateCardRequest,
            json!({ "payment_method_id": method.id, "changes": data }),
        )
        .await?;

        let outcome = Outcome::from_result(
            self.processor
                .update_card(&method.card_reference, data)
                .await,
        );
        let redirect_url = self.method_redirect_url(method).await?;

        match outcome {
            Outcome::Approved(reply) => {
                self.record(
                    method.transaction_id,
                    MessageKind::UpdateCardResponse,
                    reply_payload(&reply),
                )
                .await?;

                let updated = match &data.name {
                    Some(name) => self
                        .store
                        .rename_payment_method(method.id, name.trim())
                        .await?
                        .ok_or(AppError::PaymentMethodNotFound)?,
                    None => method.clone(),
                };

                Ok(
                    GatewayResponse::success("Card updated successfully", redirect_url)
                        .with_saved_method(updated),
                )
            }
            failed => {
                self.record(
                    method.transaction_id,
                    MessageKind::UpdateCardError,
                    failed.error_payload(),
                )
                .await?;
                Ok(GatewayResponse::failure(failed.failure_text(), redirect_url))
            }
        }
    }

    /// Remove a saved card at the processor, then soft delete it locally.
    pub async fn delete_card(
        &self,
        method: &SavedPaymentMethod,
    ) -> Result<GatewayResponse, AppError> {
        self.record(
            method.transaction_id,
            MessageKind::DeleteCardRequest,
            json!({ "payment_method_id": method.id }),
        )
        .await?;

        let outcome =
            Outcome::from_result(self.processor.delete_card(&method.card_reference).await);
        let redirect_url = self.method_redirect_url(method).await?;

        match outcome {
            Outcome::Approved(reply) => {
                self.record(
                    method.transaction_id,
                    MessageKind::DeleteCardResponse,
                    reply_payload(&reply),
                )
                .await?;
                self.store.deactivate_payment_method(method.id).await?;

                tracing::info!(payment_method_id = %method.id, "card deleted");
                Ok(GatewayResponse::success(
                    "Card deleted successfully",
                    redirect_url,
                ))
            }
            failed => {
                self.record(
                    method.transaction_id,
                    MessageKind::DeleteCardError,
                    failed.error_payload(),
                )
                .await?;
                Ok(GatewayResponse::failure(failed.failure_text(), redirect_url))
            }
        }
    }

    async fn mark_failed(
        &self,
        transaction: &mut Transaction,
        expected: &[TransactionStatus],
    ) -> Result<(), AppError> {
        if self
            .store
            .transition_status(transaction.id, expected, TransactionStatus::Error)
            .await?
        {
            transaction.status = TransactionStatus::Error;
        }
        Ok(())
    }

    async fn method_redirect_url(&self, method: &SavedPaymentMethod) -> Result<String, AppError> {
        Ok(self
            .store
            .find_transaction_by_id(method.transaction_id)
            .await?
            .map(|t| self.redirect_url(&t))
            .unwrap_or_else(|| self.base_url.clone()))
    }
}
