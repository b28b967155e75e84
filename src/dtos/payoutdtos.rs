// dtos/payoutdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        payoutmodel::{PendingPayout, PayoutType},
        subscriptionmodels::SubscriptionPlan,
        usermodel::User,
    },
    utils::currency::cents_to_usd,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutResponseDto {
    pub id: Uuid,
    pub payout_type: PayoutType,
    pub amount: f64,
    pub release_date: DateTime<Utc>,
    pub transferred: bool,
    pub order_id: Option<Uuid>,
}

impl From<PendingPayout> for PayoutResponseDto {
    fn from(payout: PendingPayout) -> Self {
        Self {
            id: payout.id,
            payout_type: payout.payout_type,
            amount: cents_to_usd(payout.amount),
            release_date: payout.release_date,
            transferred: payout.transferred,
            order_id: payout.order_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponseDto {
    pub total_earning: f64,
    pub current_balance: f64,
    pub pending_clearence: f64,
    pub tip: f64,
    pub projects_completed: i32,
}

impl From<&User> for BalanceResponseDto {
    fn from(user: &User) -> Self {
        Self {
            total_earning: cents_to_usd(user.total_earning),
            current_balance: cents_to_usd(user.current_balance),
            pending_clearence: cents_to_usd(user.pending_clearence),
            tip: cents_to_usd(user.tip),
            projects_completed: user.projects_completed,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpsertPlanDto {
    #[validate(length(min = 1, max = 100, message = "Plan name is required"))]
    pub name: String,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    #[validate(range(min = 1, max = 365, message = "Duration must be between 1 and 365 days"))]
    pub duration_days: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponseDto {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub duration_days: i32,
    pub is_active: bool,
}

impl From<SubscriptionPlan> for PlanResponseDto {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            id: plan.id,
            name: plan.name,
            price: cents_to_usd(plan.price),
            duration_days: plan.duration_days,
            is_active: plan.is_active,
        }
    }
}
