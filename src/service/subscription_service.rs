// service/subscription_service.rs
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, plandb::PlanExt, userdb::UserExt},
    models::{subscriptionmodels::SubscriptionPlan, usermodel::User},
    service::error::ServiceError,
};

const PLAN_CACHE_TTL_SECS: u64 = 900;

/// In-process cache of the subscription plan table. One owner, explicit
/// contract: `get()` serves from cache until the TTL lapses or a write
/// calls `invalidate()`.
#[derive(Debug)]
pub struct PlanCache {
    inner: RwLock<Option<(Vec<SubscriptionPlan>, Instant)>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub async fn get(&self, db_client: &DBClient) -> Result<Vec<SubscriptionPlan>, ServiceError> {
        {
            let guard = self.inner.read().await;
            if let Some((plans, loaded_at)) = guard.as_ref() {
                if loaded_at.elapsed().as_secs() < PLAN_CACHE_TTL_SECS {
                    return Ok(plans.clone());
                }
            }
        }

        let plans = db_client.list_active_plans().await?;
        let mut guard = self.inner.write().await;
        *guard = Some((plans.clone(), Instant::now()));
        Ok(plans)
    }

    pub async fn invalidate(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct SubscriptionService {
    db_client: Arc<DBClient>,
    plan_cache: PlanCache,
}

impl SubscriptionService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self {
            db_client,
            plan_cache: PlanCache::new(),
        }
    }

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, ServiceError> {
        self.plan_cache.get(&self.db_client).await
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>, ServiceError> {
        let plans = self.plan_cache.get(&self.db_client).await?;
        Ok(plans.into_iter().find(|p| p.id == plan_id))
    }

    /// Writes invalidate the cache so the next read sees fresh rows.
    pub async fn upsert_plan(
        &self,
        name: &str,
        price: i64,
        duration_days: i32,
        is_active: bool,
    ) -> Result<SubscriptionPlan, ServiceError> {
        let plan = self
            .db_client
            .upsert_plan(name, price, duration_days, is_active)
            .await?;
        self.plan_cache.invalidate().await;
        Ok(plan)
    }

    /// First activation of a plan window after a successful purchase.
    pub async fn activate_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        stripe_subscription_id: Option<String>,
    ) -> Result<Option<User>, ServiceError> {
        let plan = self
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("Unknown plan {}", plan_id)))?;

        let expires_at = Utc::now() + Duration::days(plan.duration_days as i64);
        Ok(self
            .db_client
            .activate_subscription(user_id, plan_id, stripe_subscription_id, expires_at)
            .await?)
    }

    /// Invoice renewal keyed by the gateway subscription id.
    pub async fn renew_by_subscription(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<User>, ServiceError> {
        let user = match self
            .db_client
            .get_user_by_subscription(stripe_subscription_id)
            .await?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        let duration_days = match user.subscription_plan_id {
            Some(plan_id) => self
                .get_plan(plan_id)
                .await?
                .map(|p| p.duration_days)
                .unwrap_or(30),
            None => 30,
        };

        Ok(self
            .db_client
            .extend_subscription(stripe_subscription_id, duration_days)
            .await?)
    }
}
