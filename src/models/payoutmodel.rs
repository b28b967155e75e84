// models/payoutmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payout_type", rename_all = "snake_case")]
pub enum PayoutType {
    OrderPayment,
    OrderTip,
}

/// Durable record of money owed to a freelancer. The release date is
/// fixed at creation time and never rescheduled; `transferred` flips
/// false -> true exactly once, in the same transaction as the ledger
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingPayout {
    pub id: Uuid,
    pub freelancer_id: Uuid,
    pub payout_type: PayoutType,
    pub amount: i64,
    pub destination_account_id: String,
    pub transfer_group: String,
    pub release_date: DateTime<Utc>,
    pub transferred: bool,
    pub transaction_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PendingPayout {
    /// Eligible iff due and not yet transferred. The comparison is
    /// inclusive: a payout releasing exactly now is processed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.transferred && self.release_date <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn payout(release_offset: Duration, transferred: bool) -> PendingPayout {
        let now = Utc::now();
        PendingPayout {
            id: Uuid::new_v4(),
            freelancer_id: Uuid::new_v4(),
            payout_type: PayoutType::OrderPayment,
            amount: 5000,
            destination_account_id: "acct_123".to_string(),
            transfer_group: "order_x".to_string(),
            release_date: now + release_offset,
            transferred,
            transaction_id: None,
            order_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    #[test]
    fn due_when_release_date_in_past() {
        let p = payout(Duration::days(-1), false);
        assert!(p.is_due(Utc::now()));
    }

    #[test]
    fn due_when_release_date_is_exactly_now() {
        let p = payout(Duration::zero(), false);
        assert!(p.is_due(p.release_date));
    }

    #[test]
    fn not_due_when_still_held() {
        let p = payout(Duration::days(3), false);
        assert!(!p.is_due(Utc::now()));
    }

    #[test]
    fn never_due_once_transferred() {
        let p = payout(Duration::days(-10), true);
        assert!(!p.is_due(Utc::now()));
    }
}
