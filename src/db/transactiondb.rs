// db/transactiondb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::transactionmodel::*;

#[async_trait]
pub trait TransactionExt {
    async fn create_transaction(
        &self,
        user_id: Uuid,
        order_id: Option<Uuid>,
        purpose: TransactionPurpose,
        amount: i64,
        intent_id: Option<String>,
        session_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Transaction, Error>;

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, Error>;

    async fn get_transaction_by_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Transaction>, Error>;

    async fn get_transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, Error>;

    /// Conditional settle from pending. Returns None when the record was
    /// already settled (webhook replay) or failed.
    async fn settle_transaction(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>, Error>;

    async fn list_transactions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, Error>;
}

const TX_COLUMNS: &str = r#"
    id, user_id, order_id, purpose, amount, status, intent_id, session_id,
    metadata, created_at, updated_at
"#;

#[async_trait]
impl TransactionExt for DBClient {
    async fn create_transaction(
        &self,
        user_id: Uuid,
        order_id: Option<Uuid>,
        purpose: TransactionPurpose,
        amount: i64,
        intent_id: Option<String>,
        session_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Transaction, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (user_id, order_id, purpose, amount, intent_id, session_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TX_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(order_id)
        .bind(purpose)
        .bind(amount)
        .bind(intent_id)
        .bind(session_id)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_transaction_by_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE intent_id = $1",
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE session_id = $1",
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn settle_transaction(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {TX_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_transactions_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
