// db/orderdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ordermodel::*;

/// Outcome of the conditional capture claim on an order.
#[derive(Debug, PartialEq)]
pub enum CaptureClaim {
    /// This caller owns the capture; nobody else can claim until released.
    Claimed(Order),
    /// The conditional update matched no row; the caller must re-read to
    /// find out why (missing, wrong state, no escrow, concurrent claim).
    NotClaimed,
}

#[async_trait]
pub trait OrderExt {
    /// Accept an offer and create its order in one transaction. The
    /// offer move is a conditional update (non-terminal states only);
    /// the insert relies on the UNIQUE index on orders.offer_id.
    async fn create_order_for_offer(
        &self,
        offer_id: Uuid,
        job_id: Option<Uuid>,
        employer_id: Uuid,
        freelancer_id: Uuid,
        total_amount: i64,
    ) -> Result<Order, Error>;

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, Error>;

    async fn get_order_by_intent(&self, intent_id: &str) -> Result<Option<Order>, Error>;

    /// Store the escrow intent id, only if none is set yet. Returns None
    /// when an intent id already exists (caller reuses it).
    async fn set_order_intent(
        &self,
        order_id: Uuid,
        intent_id: &str,
    ) -> Result<Option<Order>, Error>;

    /// Webhook-driven transition: payment captured into escrow. One
    /// transaction moving the order payment_pending -> in_progress,
    /// flipping its payment status to escrow_held, settling the linked
    /// transaction and filling the referenced job. Returns None when the
    /// order already left payment_pending (idempotent replay).
    async fn mark_order_in_progress(&self, order_id: Uuid) -> Result<Option<Order>, Error>;

    /// Freelancer hands the work over: in_progress | in_revision -> delivered.
    async fn mark_order_delivered(&self, order_id: Uuid) -> Result<Option<Order>, Error>;

    /// Compare-and-swap claim taken before the external capture call so
    /// that concurrent completion attempts cannot both reach the gateway.
    async fn claim_capture(&self, order_id: Uuid) -> Result<CaptureClaim, Error>;

    /// Give the claim back after a failed capture so the next attempt is
    /// eligible again. No-op once the order is completed.
    async fn release_capture_claim(&self, order_id: Uuid) -> Result<(), Error>;

    /// Local commit after a confirmed capture: order -> completed,
    /// payment released, freelancer's completed-project counter bumped,
    /// and the freelancer's net enqueued as a pending payout (with its
    /// pending-clearance increment). One transaction. The order-payment
    /// transaction stays escrow_held until the payout runner transfers.
    async fn finalize_completion(
        &self,
        order_id: Uuid,
        net_amount: i64,
        destination_account_id: &str,
        transfer_group: &str,
        release_date: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Order>, Error>;

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, Error>;
}

const ORDER_COLUMNS: &str = r#"
    id, offer_id, job_id, employer_id, freelancer_id, total_amount,
    intent_id, status, payment_status, capture_claimed, created_at, updated_at
"#;

#[async_trait]
impl OrderExt for DBClient {
    async fn create_order_for_offer(
        &self,
        offer_id: Uuid,
        job_id: Option<Uuid>,
        employer_id: Uuid,
        freelancer_id: Uuid,
        total_amount: i64,
    ) -> Result<Order, Error> {
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query(
            r#"
            UPDATE offers
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'reviewed', 'interviewing')
            "#,
        )
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;

        if accepted.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (offer_id, job_id, employer_id, freelancer_id, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(offer_id)
        .bind(job_id)
        .bind(employer_id)
        .bind(freelancer_id)
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1",
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_order_by_intent(&self, intent_id: &str) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE intent_id = $1",
        ))
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_order_intent(
        &self,
        order_id: Uuid,
        intent_id: &str,
    ) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET intent_id = $2, updated_at = NOW()
            WHERE id = $1 AND intent_id IS NULL
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_order_in_progress(&self, order_id: Uuid) -> Result<Option<Order>, Error> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = 'in_progress', payment_status = 'escrow_held', updated_at = NOW()
            WHERE id = $1 AND status = 'payment_pending' AND payment_status = 'payment_pending'
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            // Already past payment_pending: replayed webhook, nothing to do.
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'escrow_held', updated_at = NOW()
            WHERE order_id = $1 AND purpose = 'order_payment' AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if let Some(job_id) = order.job_id {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'filled', updated_at = NOW()
                WHERE id = $1 AND status = 'open'
                "#,
            )
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(order))
    }

    async fn mark_order_delivered(&self, order_id: Uuid) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = 'delivered', updated_at = NOW()
            WHERE id = $1 AND status IN ('in_progress', 'in_revision')
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn claim_capture(&self, order_id: Uuid) -> Result<CaptureClaim, Error> {
        let claimed = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET capture_claimed = TRUE, updated_at = NOW()
            WHERE id = $1
              AND capture_claimed = FALSE
              AND status IN ('in_progress', 'delivered')
              AND payment_status = 'escrow_held'
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match claimed {
            Some(order) => CaptureClaim::Claimed(order),
            None => CaptureClaim::NotClaimed,
        })
    }

    async fn release_capture_claim(&self, order_id: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE orders
            SET capture_claimed = FALSE, updated_at = NOW()
            WHERE id = $1 AND status <> 'completed'
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_completion(
        &self,
        order_id: Uuid,
        net_amount: i64,
        destination_account_id: &str,
        transfer_group: &str,
        release_date: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Order>, Error> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = 'completed', payment_status = 'released_to_freelancer', updated_at = NOW()
            WHERE id = $1 AND capture_claimed = TRUE AND status IN ('in_progress', 'delivered')
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE users
            SET projects_completed = projects_completed + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.freelancer_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO pending_payouts
                (freelancer_id, payout_type, amount, destination_account_id,
                 transfer_group, release_date, transaction_id, order_id)
            VALUES ($1, 'order_payment', $2, $3, $4, $5,
                    (SELECT id FROM transactions
                     WHERE order_id = $6 AND purpose = 'order_payment'
                     LIMIT 1),
                    $6)
            "#,
        )
        .bind(order.freelancer_id)
        .bind(net_amount)
        .bind(destination_account_id)
        .bind(transfer_group)
        .bind(release_date)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET pending_clearence = pending_clearence + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order.freelancer_id)
        .bind(net_amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(order))
    }

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE employer_id = $1 OR freelancer_id = $1
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
