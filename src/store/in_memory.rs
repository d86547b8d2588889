//! In-memory implementation of the payment store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::api_key::ApiKey;
use crate::models::message::{Message, NewMessage};
use crate::models::payment_method::{NewSavedPaymentMethod, SavedPaymentMethod};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::store::{CLAIM_TTL, PaymentStore, transition_sources};

fn claim_is_live(since: Option<DateTime<Utc>>) -> bool {
    let ttl = chrono::Duration::seconds(CLAIM_TTL.as_secs() as i64);
    since.is_some_and(|since| since > Utc::now() - ttl)
}

#[derive(Default)]
struct Inner {
    api_keys: HashMap<String, ApiKey>,
    transactions: HashMap<Uuid, Transaction>,
    methods: HashMap<Uuid, SavedPaymentMethod>,
    messages: Vec<Message>,
    writes: usize,
}

/// A thread-safe in-memory payment store.
///
/// All state sits behind a single `RwLock`, which makes every conditional
/// update atomic. Used by tests and for running without PostgreSQL.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active API key and return its record.
    pub async fn insert_api_key(&self, raw_key: &str, business_name: &str) -> ApiKey {
        let key = ApiKey {
            id: Uuid::new_v4(),
            key_hash: ApiKey::hash_key(raw_key),
            business_name: business_name.to_string(),
            created_at: Utc::now(),
            is_active: true,
        };
        let mut inner = self.inner.write().await;
        inner.api_keys.insert(key.key_hash.clone(), key.clone());
        key
    }

    /// Number of mutating calls made against the store (API key setup excluded).
    pub async fn write_count(&self) -> usize {
        self.inner.read().await.writes
    }

    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .api_keys
            .get(key_hash)
            .filter(|key| key.is_active)
            .cloned())
    }

    async fn ensure_transaction(&self, transaction: &Transaction) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        inner
            .transactions
            .entry(transaction.id)
            .or_insert_with(|| transaction.clone());
        Ok(())
    }

    async fn find_transaction(&self, identifier: &str) -> Result<Option<Transaction>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .values()
            .find(|t| t.identifier == identifier)
            .cloned())
    }

    async fn find_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.get(&id).cloned())
    }

    async fn set_return_url(&self, id: Uuid, return_url: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        if let Some(transaction) = inner.transactions.get_mut(&id) {
            transaction.return_url = Some(return_url.to_string());
            transaction.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn claim_transaction(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        match inner.transactions.get_mut(&id) {
            Some(transaction)
                if expected.contains(&transaction.status)
                    && !claim_is_live(transaction.processing_since) =>
            {
                transaction.processing_since = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        if let Some(transaction) = inner.transactions.get_mut(&id) {
            transaction.processing_since = None;
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
        next: TransactionStatus,
    ) -> Result<bool, AppError> {
        let sources = transition_sources(expected, next);
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        match inner.transactions.get_mut(&id) {
            Some(transaction) if sources.contains(&transaction.status) => {
                transaction.status = next;
                transaction.processing_since = None;
                transaction.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_payment_method(
        &self,
        method: NewSavedPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;

        let saved = method.into_saved();
        match inner.transactions.get_mut(&saved.transaction_id) {
            Some(transaction) if transaction.status == TransactionStatus::Created => {
                transaction.status = TransactionStatus::Complete;
                transaction.saved_method_id = Some(saved.id);
                transaction.processing_since = None;
                transaction.updated_at = Utc::now();
            }
            _ => return Ok(None),
        }
        inner.methods.insert(saved.id, saved.clone());

        Ok(Some(saved))
    }

    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        let stored = Message {
            id: message.id,
            transaction_id: message.transaction_id,
            kind: message.kind,
            payload: message.payload,
            created_at: Utc::now(),
        };
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn messages_for(&self, transaction_id: Uuid) -> Result<Vec<Message>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn find_payment_method(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .methods
            .get(&id)
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned())
    }

    async fn list_payment_methods(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SavedPaymentMethod>, AppError> {
        let inner = self.inner.read().await;
        let mut methods: Vec<SavedPaymentMethod> = inner
            .methods
            .values()
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned()
            .collect();
        methods.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(methods)
    }

    async fn rename_payment_method(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        Ok(inner
            .methods
            .get_mut(&id)
            .filter(|m| m.is_active)
            .map(|m| {
                m.name = name.to_string();
                m.updated_at = Utc::now();
                m.clone()
            }))
    }

    async fn deactivate_payment_method(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        match inner.methods.get_mut(&id) {
            Some(method) if method.is_active => {
                method.is_active = false;
                method.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageKind;
    use serde_json::json;

    #[tokio::test]
    async fn ensure_transaction_does_not_overwrite() {
        let store = InMemoryPaymentStore::new();
        let mut transaction = Transaction::new(Uuid::new_v4(), None);
        store.ensure_transaction(&transaction).await.unwrap();

        transaction.status = TransactionStatus::Complete;
        store.ensure_transaction(&transaction).await.unwrap();

        let stored = store
            .find_transaction(&transaction.identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Created);
    }

    #[tokio::test]
    async fn transition_requires_expected_status() {
        let store = InMemoryPaymentStore::new();
        let transaction = Transaction::new(Uuid::new_v4(), None);
        store.ensure_transaction(&transaction).await.unwrap();

        let created = [TransactionStatus::Created];
        assert!(
            store
                .transition_status(transaction.id, &created, TransactionStatus::Complete)
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition_status(transaction.id, &created, TransactionStatus::Error)
                .await
                .unwrap()
        );

        let stored = store
            .find_transaction_by_id(transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Complete);
    }

    #[tokio::test]
    async fn attach_only_once() {
        let store = InMemoryPaymentStore::new();
        let user_id = Uuid::new_v4();
        let transaction = Transaction::new(user_id, None);
        store.ensure_transaction(&transaction).await.unwrap();

        let method = |reference: &str| NewSavedPaymentMethod {
            id: Uuid::new_v4(),
            card_reference: reference.to_string(),
            last_four_digits: "4242".to_string(),
            name: "************4242".to_string(),
            user_id,
            transaction_id: transaction.id,
        };

        let first = store.attach_payment_method(method("tok_1")).await.unwrap();
        let second = store.attach_payment_method(method("tok_2")).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.list_payment_methods(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn messages_are_scoped_and_ordered() {
        let store = InMemoryPaymentStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .save_message(NewMessage::new(a, MessageKind::CreateCardRequest, json!({})))
            .await
            .unwrap();
        store
            .save_message(NewMessage::new(b, MessageKind::CreateCardRequest, json!({})))
            .await
            .unwrap();
        store
            .save_message(NewMessage::new(a, MessageKind::CreateCardResponse, json!({})))
            .await
            .unwrap();

        let kinds: Vec<MessageKind> = store
            .messages_for(a)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![MessageKind::CreateCardRequest, MessageKind::CreateCardResponse]
        );
    }

    #[tokio::test]
    async fn inactive_methods_are_hidden() {
        let store = InMemoryPaymentStore::new();
        let user_id = Uuid::new_v4();
        let transaction = Transaction::new(user_id, None);
        store.ensure_transaction(&transaction).await.unwrap();
        let saved = store
            .attach_payment_method(NewSavedPaymentMethod {
                id: Uuid::new_v4(),
                card_reference: "tok_1".to_string(),
                last_four_digits: "4242".to_string(),
                name: "card".to_string(),
                user_id,
                transaction_id: transaction.id,
            })
            .await
            .unwrap()
            .unwrap();

        assert!(store.deactivate_payment_method(saved.id).await.unwrap());
        assert!(!store.deactivate_payment_method(saved.id).await.unwrap());
        assert!(
            store
                .find_payment_method(saved.id, user_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn transition_refuses_backward_moves() {
        let store = InMemoryPaymentStore::new();
        let mut transaction = Transaction::new(Uuid::new_v4(), None);
        transaction.status = TransactionStatus::Complete;
        store.ensure_transaction(&transaction).await.unwrap();

        let moved = store
            .transition_status(
                transaction.id,
                &[TransactionStatus::Complete],
                TransactionStatus::Pending,
            )
            .await
            .unwrap();

        assert!(!moved);
        let stored = store
            .find_transaction_by_id(transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Complete);
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let store = InMemoryPaymentStore::new();
        let transaction = Transaction::new(Uuid::new_v4(), None);
        store.ensure_transaction(&transaction).await.unwrap();
        let created = [TransactionStatus::Created];

        assert!(store.claim_transaction(transaction.id, &created).await.unwrap());
        assert!(!store.claim_transaction(transaction.id, &created).await.unwrap());

        store.release_claim(transaction.id).await.unwrap();
        assert!(store.claim_transaction(transaction.id, &created).await.unwrap());
    }

    #[tokio::test]
    async fn transition_clears_claim() {
        let store = InMemoryPaymentStore::new();
        let transaction = Transaction::new(Uuid::new_v4(), None);
        store.ensure_transaction(&transaction).await.unwrap();
        let open = [TransactionStatus::Created, TransactionStatus::Pending];

        assert!(store.claim_transaction(transaction.id, &open).await.unwrap());
        assert!(
            store
                .transition_status(transaction.id, &open, TransactionStatus::Error)
                .await
                .unwrap()
        );

        let stored = store
            .find_transaction_by_id(transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.processing_since, None);
        assert!(!store.claim_transaction(transaction.id, &open).await.unwrap());
    }

    #[tokio::test]
    async fn stale_claim_can_be_taken_over() {
        let store = InMemoryPaymentStore::new();
        let mut transaction = Transaction::new(Uuid::new_v4(), None);
        transaction.processing_since = Some(Utc::now() - chrono::Duration::hours(1));
        store.ensure_transaction(&transaction).await.unwrap();

        assert!(
            store
                .claim_transaction(transaction.id, &[TransactionStatus::Created])
                .await
                .unwrap()
        );
    }
}
