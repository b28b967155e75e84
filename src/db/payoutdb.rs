// db/payoutdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, Row};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::payoutmodel::*;

/// Ledger/payout rows that disagree; surfaced by the runner for
/// operational follow-up.
#[derive(Debug, serde::Serialize)]
pub struct ClearanceMismatch {
    pub freelancer_id: Uuid,
    pub pending_clearence: i64,
    pub outstanding_payouts: i64,
}

#[async_trait]
pub trait PayoutExt {
    /// Persist a pending payout and, in the same transaction, settle the
    /// linked transaction to the enqueued net amount and bump the
    /// freelancer's pending clearance. Returns RowNotFound when the
    /// linked transaction was already settled (replayed trigger).
    #[allow(clippy::too_many_arguments)]
    async fn enqueue_payout(
        &self,
        freelancer_id: Uuid,
        payout_type: PayoutType,
        net_amount: i64,
        destination_account_id: &str,
        transfer_group: &str,
        release_date: DateTime<Utc>,
        transaction_id: Option<Uuid>,
        order_id: Option<Uuid>,
    ) -> Result<PendingPayout, Error>;

    /// Due and untransferred, oldest release first. The boundary is
    /// inclusive: release_date == now is eligible.
    async fn get_due_payouts(&self, now: DateTime<Utc>) -> Result<Vec<PendingPayout>, Error>;

    /// Settle one payout after a confirmed external transfer: flip
    /// `transferred` (conditionally, so a racing writer loses), apply the
    /// ledger increments and move the linked transaction to
    /// released_to_freelancer, all in one transaction. Returns None when
    /// another writer already settled it.
    async fn settle_payout(&self, payout_id: Uuid) -> Result<Option<PendingPayout>, Error>;

    async fn list_payouts_for_freelancer(
        &self,
        freelancer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PendingPayout>, Error>;

    /// Freelancers whose pending_clearence does not equal the sum of
    /// their outstanding payouts.
    async fn pending_clearance_mismatches(&self) -> Result<Vec<ClearanceMismatch>, Error>;
}

const PAYOUT_COLUMNS: &str = r#"
    id, freelancer_id, payout_type, amount, destination_account_id, transfer_group,
    release_date, transferred, transaction_id, order_id, created_at, updated_at
"#;

#[async_trait]
impl PayoutExt for DBClient {
    async fn enqueue_payout(
        &self,
        freelancer_id: Uuid,
        payout_type: PayoutType,
        net_amount: i64,
        destination_account_id: &str,
        transfer_group: &str,
        release_date: DateTime<Utc>,
        transaction_id: Option<Uuid>,
        order_id: Option<Uuid>,
    ) -> Result<PendingPayout, Error> {
        let mut tx = self.pool.begin().await?;

        if let Some(txn_id) = transaction_id {
            // The recorded transaction amount must match what is enqueued.
            let settled = sqlx::query(
                r#"
                UPDATE transactions
                SET amount = $2, status = 'escrow_held', updated_at = NOW()
                WHERE id = $1 AND status = 'pending'
                "#,
            )
            .bind(txn_id)
            .bind(net_amount)
            .execute(&mut *tx)
            .await?;

            if settled.rows_affected() == 0 {
                return Err(Error::RowNotFound);
            }
        }

        let payout = sqlx::query_as::<_, PendingPayout>(&format!(
            r#"
            INSERT INTO pending_payouts
                (freelancer_id, payout_type, amount, destination_account_id,
                 transfer_group, release_date, transaction_id, order_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYOUT_COLUMNS}
            "#,
        ))
        .bind(freelancer_id)
        .bind(payout_type)
        .bind(net_amount)
        .bind(destination_account_id)
        .bind(transfer_group)
        .bind(release_date)
        .bind(transaction_id)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET pending_clearence = pending_clearence + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(freelancer_id)
        .bind(net_amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payout)
    }

    async fn get_due_payouts(&self, now: DateTime<Utc>) -> Result<Vec<PendingPayout>, Error> {
        sqlx::query_as::<_, PendingPayout>(&format!(
            r#"
            SELECT {PAYOUT_COLUMNS}
            FROM pending_payouts
            WHERE release_date <= $1 AND transferred = FALSE
            ORDER BY release_date ASC
            "#,
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    async fn settle_payout(&self, payout_id: Uuid) -> Result<Option<PendingPayout>, Error> {
        let mut tx = self.pool.begin().await?;

        let payout = sqlx::query_as::<_, PendingPayout>(&format!(
            r#"
            UPDATE pending_payouts
            SET transferred = TRUE, updated_at = NOW()
            WHERE id = $1 AND transferred = FALSE
            RETURNING {PAYOUT_COLUMNS}
            "#,
        ))
        .bind(payout_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payout) = payout else {
            // A racing writer settled it first; leave the ledger alone.
            return Ok(None);
        };

        let tip_amount = if payout.payout_type == PayoutType::OrderTip {
            payout.amount
        } else {
            0
        };

        // Guard keeps pending_clearence from going negative; a miss means
        // the ledger drifted and the whole settle rolls back.
        let ledger = sqlx::query(
            r#"
            UPDATE users
            SET total_earning = total_earning + $2,
                current_balance = current_balance + $2,
                pending_clearence = pending_clearence - $2,
                tip = tip + $3,
                updated_at = NOW()
            WHERE id = $1 AND pending_clearence >= $2
            "#,
        )
        .bind(payout.freelancer_id)
        .bind(payout.amount)
        .bind(tip_amount)
        .execute(&mut *tx)
        .await?;

        if ledger.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }

        if let Some(txn_id) = payout.transaction_id {
            sqlx::query(
                r#"
                UPDATE transactions
                SET status = 'released_to_freelancer', updated_at = NOW()
                WHERE id = $1 AND status = 'escrow_held'
                "#,
            )
            .bind(txn_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(payout))
    }

    async fn list_payouts_for_freelancer(
        &self,
        freelancer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PendingPayout>, Error> {
        sqlx::query_as::<_, PendingPayout>(&format!(
            r#"
            SELECT {PAYOUT_COLUMNS}
            FROM pending_payouts
            WHERE freelancer_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(freelancer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn pending_clearance_mismatches(&self) -> Result<Vec<ClearanceMismatch>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.pending_clearence,
                   COALESCE(SUM(p.amount) FILTER (WHERE p.transferred = FALSE), 0) AS outstanding
            FROM users u
            LEFT JOIN pending_payouts p ON p.freelancer_id = u.id
            GROUP BY u.id, u.pending_clearence
            HAVING u.pending_clearence <>
                   COALESCE(SUM(p.amount) FILTER (WHERE p.transferred = FALSE), 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ClearanceMismatch {
                freelancer_id: row.get("id"),
                pending_clearence: row.get("pending_clearence"),
                outstanding_payouts: row.get("outstanding"),
            })
            .collect())
    }
}
