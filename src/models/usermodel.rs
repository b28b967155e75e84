// models/usermodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Freelancer,
    Employer,
    JobSeeker,
    Admin,
}

/// Account record with the freelancer ledger fields embedded.
///
/// Ledger fields are in cents and are mutated only by the payout runner
/// and the order-completion flow, always via atomic increments.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub stripe_account_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub onboarded: bool,
    pub total_earning: i64,
    pub current_balance: i64,
    pub pending_clearence: i64,
    pub tip: i64,
    pub projects_completed: i32,
    pub subscription_plan_id: Option<Uuid>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn current_balance_in_usd(&self) -> f64 {
        self.current_balance as f64 / 100.0
    }

    pub fn pending_clearence_in_usd(&self) -> f64 {
        self.pending_clearence as f64 / 100.0
    }
}
