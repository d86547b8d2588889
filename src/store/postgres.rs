//! PostgreSQL implementation of the payment store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::api_key::ApiKey;
use crate::models::message::{Message, NewMessage};
use crate::models::payment_method::{NewSavedPaymentMethod, SavedPaymentMethod};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::store::{CLAIM_TTL, PaymentStore, transition_sources};

const TRANSACTION_COLUMNS: &str =
    "id, identifier, owner_id, status, return_url, saved_method_id, processing_since, created_at, updated_at";

const METHOD_COLUMNS: &str = "id, card_reference, last_four_digits, name, user_id, transaction_id, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgPaymentStore {
    pool: DbPool,
}

impl PgPaymentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT id, key_hash, business_name, created_at, is_active
             FROM api_keys
             WHERE key_hash = $1 AND is_active = true",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn ensure_transaction(&self, transaction: &Transaction) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id,
                identifier,
                owner_id,
                status,
                return_url,
                saved_method_id,
                processing_since,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.identifier)
        .bind(transaction.owner_id)
        .bind(transaction.status.as_str())
        .bind(&transaction.return_url)
        .bind(transaction.saved_method_id)
        .bind(transaction.processing_since)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_transaction(&self, identifier: &str) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn find_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn set_return_url(&self, id: Uuid, return_url: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE payment_transactions SET return_url = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(return_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn claim_transaction(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
    ) -> Result<bool, AppError> {
        let expected: Vec<&str> = expected.iter().map(TransactionStatus::as_str).collect();

        let claimed = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET processing_since = NOW()
            WHERE id = $1
              AND status = ANY($2)
              AND (processing_since IS NULL
                   OR processing_since < NOW() - make_interval(secs => $3))
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(CLAIM_TTL.as_secs_f64())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(claimed > 0)
    }

    async fn release_claim(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE payment_transactions SET processing_since = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: &[TransactionStatus],
        next: TransactionStatus,
    ) -> Result<bool, AppError> {
        let sources: Vec<&str> = transition_sources(expected, next)
            .iter()
            .map(TransactionStatus::as_str)
            .collect();
        if sources.is_empty() {
            return Ok(false);
        }

        // The WHERE clause is the compare-and-swap: a row that moved on is not touched
        let updated = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = $1,
                processing_since = NULL,
                updated_at = NOW()
            WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(next.as_str())
        .bind(id)
        .bind(sources)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn attach_payment_method(
        &self,
        method: NewSavedPaymentMethod,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, SavedPaymentMethod>(&format!(
            r#"
            INSERT INTO saved_payment_methods (
                id,
                card_reference,
                last_four_digits,
                name,
                user_id,
                transaction_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {METHOD_COLUMNS}
            "#
        ))
        .bind(method.id)
        .bind(&method.card_reference)
        .bind(&method.last_four_digits)
        .bind(&method.name)
        .bind(method.user_id)
        .bind(method.transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        let linked = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET saved_method_id = $1,
                status = 'complete',
                processing_since = NULL,
                updated_at = NOW()
            WHERE id = $2 AND status = 'created'
            "#,
        )
        .bind(saved.id)
        .bind(method.transaction_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if linked == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;

        Ok(Some(saved))
    }

    async fn save_message(&self, message: NewMessage) -> Result<Message, AppError> {
        let stored = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO gateway_messages (id, transaction_id, kind, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, transaction_id, kind, payload, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.transaction_id)
        .bind(message.kind.as_str())
        .bind(&message.payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn messages_for(&self, transaction_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, transaction_id, kind, payload, created_at
            FROM gateway_messages
            WHERE transaction_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn find_payment_method(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let method = sqlx::query_as::<_, SavedPaymentMethod>(&format!(
            "SELECT {METHOD_COLUMNS} FROM saved_payment_methods
             WHERE id = $1 AND user_id = $2 AND is_active = true"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(method)
    }

    async fn list_payment_methods(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SavedPaymentMethod>, AppError> {
        let methods = sqlx::query_as::<_, SavedPaymentMethod>(&format!(
            "SELECT {METHOD_COLUMNS} FROM saved_payment_methods
             WHERE user_id = $1 AND is_active = true
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }

    async fn rename_payment_method(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<Option<SavedPaymentMethod>, AppError> {
        let method = sqlx::query_as::<_, SavedPaymentMethod>(&format!(
            "UPDATE saved_payment_methods SET name = $1, updated_at = NOW()
             WHERE id = $2 AND is_active = true
             RETURNING {METHOD_COLUMNS}"
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(method)
    }

    async fn deactivate_payment_method(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE saved_payment_methods SET is_active = false, updated_at = NOW()
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
