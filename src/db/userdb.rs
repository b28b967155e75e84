// db/userdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    async fn get_user_by_stripe_account(
        &self,
        stripe_account_id: &str,
    ) -> Result<Option<User>, Error>;

    async fn get_user_by_subscription(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<User>, Error>;

    /// Flip the onboarded flag for the account the gateway reported on.
    /// Applied unconditionally; the flag follows the gateway's view.
    async fn set_onboarded(
        &self,
        stripe_account_id: &str,
        onboarded: bool,
    ) -> Result<Option<User>, Error>;

    async fn activate_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        stripe_subscription_id: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, Error>;

    /// Renew the subscription window keyed by the gateway subscription id.
    /// Extends from the current expiry when still in the future, from now
    /// when already lapsed.
    async fn extend_subscription(
        &self,
        stripe_subscription_id: &str,
        extend_days: i32,
    ) -> Result<Option<User>, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_stripe_account(
        &self,
        stripe_account_id: &str,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            FROM users
            WHERE stripe_account_id = $1
            "#,
        )
        .bind(stripe_account_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_subscription(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            FROM users
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_onboarded(
        &self,
        stripe_account_id: &str,
        onboarded: bool,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET onboarded = $2, updated_at = NOW()
            WHERE stripe_account_id = $1
            RETURNING
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            "#,
        )
        .bind(stripe_account_id)
        .bind(onboarded)
        .fetch_optional(&self.pool)
        .await
    }

    async fn activate_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        stripe_subscription_id: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET subscription_plan_id = $2,
                stripe_subscription_id = COALESCE($3, stripe_subscription_id),
                subscription_expires_at = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(stripe_subscription_id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn extend_subscription(
        &self,
        stripe_subscription_id: &str,
        extend_days: i32,
    ) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET subscription_expires_at =
                    GREATEST(COALESCE(subscription_expires_at, NOW()), NOW())
                    + make_interval(days => $2),
                updated_at = NOW()
            WHERE stripe_subscription_id = $1
            RETURNING
                id, name, email, role, stripe_account_id, stripe_subscription_id,
                onboarded, total_earning, current_balance, pending_clearence, tip,
                projects_completed, subscription_plan_id, subscription_expires_at,
                created_at, updated_at
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(extend_days)
        .fetch_optional(&self.pool)
        .await
    }
}
