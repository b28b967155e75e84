// db/plandb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::subscriptionmodels::SubscriptionPlan;

#[async_trait]
pub trait PlanExt {
    async fn list_active_plans(&self) -> Result<Vec<SubscriptionPlan>, Error>;

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>, Error>;

    async fn upsert_plan(
        &self,
        name: &str,
        price: i64,
        duration_days: i32,
        is_active: bool,
    ) -> Result<SubscriptionPlan, Error>;
}

#[async_trait]
impl PlanExt for DBClient {
    async fn list_active_plans(&self) -> Result<Vec<SubscriptionPlan>, Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, price, duration_days, is_active, created_at
            FROM subscription_plans
            WHERE is_active = TRUE
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>, Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, price, duration_days, is_active, created_at
            FROM subscription_plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_plan(
        &self,
        name: &str,
        price: i64,
        duration_days: i32,
        is_active: bool,
    ) -> Result<SubscriptionPlan, Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            INSERT INTO subscription_plans (name, price, duration_days, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET price = EXCLUDED.price,
                duration_days = EXCLUDED.duration_days,
                is_active = EXCLUDED.is_active
            RETURNING id, name, price, duration_days, is_active, created_at
            "#,
        )
        .bind(name)
        .bind(price)
        .bind(duration_days)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
    }
}
