// db/offerdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::offermodel::*;

pub struct NewMilestone {
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub amount: i64,
}

#[async_trait]
pub trait OfferExt {
    /// Insert an offer with its milestones in one transaction. The
    /// partial unique index on (sender_id, job_id) rejects a second live
    /// offer for the same job with a unique violation.
    async fn create_offer(
        &self,
        sender_id: Uuid,
        receiver: Receiver,
        job_id: Option<Uuid>,
        price: i64,
        duration_days: i32,
        milestones: Vec<NewMilestone>,
    ) -> Result<Offer, Error>;

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    async fn get_offer_milestones(&self, offer_id: Uuid) -> Result<Vec<OfferMilestone>, Error>;

    /// Conditional move within the review pipeline
    /// (pending -> reviewed -> interviewing). Returns None when the
    /// offer is missing or not in an advanceable state.
    async fn advance_offer_review(
        &self,
        offer_id: Uuid,
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error>;

    /// Conditional terminal move to rejected or withdrawn. Returns None
    /// when the offer is missing or already terminal.
    async fn decline_offer(
        &self,
        offer_id: Uuid,
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error>;

    async fn list_offers_for_sender(
        &self,
        sender_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error>;

    async fn list_offers_for_receiver(
        &self,
        receiver_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error>;
}

#[async_trait]
impl OfferExt for DBClient {
    async fn create_offer(
        &self,
        sender_id: Uuid,
        receiver: Receiver,
        job_id: Option<Uuid>,
        price: i64,
        duration_days: i32,
        milestones: Vec<NewMilestone>,
    ) -> Result<Offer, Error> {
        let mut tx = self.pool.begin().await?;

        let offer = sqlx::query_as::<_, Offer>(
            r#"
            INSERT INTO offers (sender_id, receiver_kind, receiver_id, job_id, price, duration_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver.kind)
        .bind(receiver.id)
        .bind(job_id)
        .bind(price)
        .bind(duration_days)
        .fetch_one(&mut *tx)
        .await?;

        for m in milestones {
            sqlx::query(
                r#"
                INSERT INTO offer_milestones (offer_id, name, due_date, amount)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(offer.id)
            .bind(m.name)
            .bind(m.due_date)
            .bind(m.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(offer)
    }

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            SELECT
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            FROM offers
            WHERE id = $1
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_offer_milestones(&self, offer_id: Uuid) -> Result<Vec<OfferMilestone>, Error> {
        sqlx::query_as::<_, OfferMilestone>(
            r#"
            SELECT id, offer_id, name, due_date, amount
            FROM offer_milestones
            WHERE offer_id = $1
            ORDER BY due_date NULLS LAST
            "#,
        )
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn advance_offer_review(
        &self,
        offer_id: Uuid,
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'reviewed')
            RETURNING
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            "#,
        )
        .bind(offer_id)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn decline_offer(
        &self,
        offer_id: Uuid,
        to: OfferStatus,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'reviewed', 'interviewing')
            RETURNING
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            "#,
        )
        .bind(offer_id)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_offers_for_sender(
        &self,
        sender_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            SELECT
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            FROM offers
            WHERE sender_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(sender_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_offers_for_receiver(
        &self,
        receiver_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            SELECT
                id, sender_id, receiver_kind, receiver_id, job_id, price,
                duration_days, status, created_at, updated_at
            FROM offers
            WHERE receiver_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(receiver_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
