// models/transactionmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `purpose` discriminator carried in gateway payment metadata.
/// Webhook dispatch branches on this tag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "transaction_purpose", rename_all = "snake_case")]
pub enum TransactionPurpose {
    OrderPayment,
    OrderBonus,
    Subscription,
    ResumePurchase,
    Payout,
}

impl TransactionPurpose {
    /// Parse the metadata tag as the gateway sends it.
    pub fn from_metadata_tag(tag: &str) -> Option<Self> {
        match tag {
            "order-payment" => Some(TransactionPurpose::OrderPayment),
            "order-bonus" => Some(TransactionPurpose::OrderBonus),
            "subscription" => Some(TransactionPurpose::Subscription),
            "resume-purchase" => Some(TransactionPurpose::ResumePurchase),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    EscrowHeld,
    ReleasedToFreelancer,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// A settled transaction must never be re-applied by a replayed
    /// webhook or a racing batch run.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            TransactionStatus::EscrowHeld
                | TransactionStatus::ReleasedToFreelancer
                | TransactionStatus::Completed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub purpose: TransactionPurpose,
    pub amount: i64,
    pub status: TransactionStatus,
    pub intent_id: Option<String>,
    pub session_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_tags_round_trip() {
        assert_eq!(
            TransactionPurpose::from_metadata_tag("order-payment"),
            Some(TransactionPurpose::OrderPayment)
        );
        assert_eq!(
            TransactionPurpose::from_metadata_tag("order-bonus"),
            Some(TransactionPurpose::OrderBonus)
        );
        assert_eq!(
            TransactionPurpose::from_metadata_tag("subscription"),
            Some(TransactionPurpose::Subscription)
        );
        assert_eq!(
            TransactionPurpose::from_metadata_tag("resume-purchase"),
            Some(TransactionPurpose::ResumePurchase)
        );
        assert_eq!(TransactionPurpose::from_metadata_tag("unknown"), None);
    }

    #[test]
    fn settled_statuses() {
        assert!(TransactionStatus::EscrowHeld.is_settled());
        assert!(TransactionStatus::ReleasedToFreelancer.is_settled());
        assert!(TransactionStatus::Completed.is_settled());
        assert!(!TransactionStatus::Pending.is_settled());
        assert!(!TransactionStatus::Failed.is_settled());
    }
}
