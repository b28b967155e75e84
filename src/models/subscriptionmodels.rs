// models/subscriptionmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}
