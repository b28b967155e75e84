// models/ordermodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    PaymentPending,
    InProgress,
    InRevision,
    Delivered,
    Completed,
    Disputed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Completion is allowed from in_progress or delivered only.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::InProgress | OrderStatus::Delivered)
    }

    /// Dispute/cancellation must be representable from any non-terminal state.
    pub fn can_dispute(&self) -> bool {
        !self.is_terminal() && *self != OrderStatus::Disputed
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    PaymentPending,
    EscrowHeld,
    ReleasedToFreelancer,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub job_id: Option<Uuid>,
    pub employer_id: Uuid,
    pub freelancer_id: Uuid,
    pub total_amount: i64,
    pub intent_id: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub capture_claimed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn total_amount_in_usd(&self) -> f64 {
        self.total_amount as f64 / 100.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Filled,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub status: JobStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_only_from_in_progress_or_delivered() {
        assert!(OrderStatus::InProgress.can_complete());
        assert!(OrderStatus::Delivered.can_complete());
        assert!(!OrderStatus::PaymentPending.can_complete());
        assert!(!OrderStatus::InRevision.can_complete());
        assert!(!OrderStatus::Completed.can_complete());
        assert!(!OrderStatus::Disputed.can_complete());
        assert!(!OrderStatus::Cancelled.can_complete());
    }

    #[test]
    fn dispute_reachable_from_non_terminal_states() {
        assert!(OrderStatus::PaymentPending.can_dispute());
        assert!(OrderStatus::InProgress.can_dispute());
        assert!(OrderStatus::Delivered.can_dispute());
        assert!(!OrderStatus::Completed.can_dispute());
        assert!(!OrderStatus::Cancelled.can_dispute());
    }
}
