// models/offermodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "offer_status", rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Reviewed,
    Interviewing,
    Accepted,
    Rejected,
    Withdrawn,
}

impl OfferStatus {
    /// Accepted, rejected and withdrawn are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Withdrawn
        )
    }

    /// States from which the receiver may accept (creating an order).
    pub fn can_accept(&self) -> bool {
        matches!(self, OfferStatus::Pending)
    }

    /// States from which the receiver may reject or the sender withdraw.
    pub fn can_decline(&self) -> bool {
        matches!(
            self,
            OfferStatus::Pending | OfferStatus::Reviewed | OfferStatus::Interviewing
        )
    }
}

/// Who an offer is addressed to. The receiver is polymorphic (an employer
/// posting jobs, or a job-seeker being pitched directly); it is resolved
/// by this discriminator rather than by trial-and-error lookups.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "receiver_kind", rename_all = "snake_case")]
pub enum ReceiverKind {
    Employer,
    JobSeeker,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Receiver {
    pub kind: ReceiverKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_kind: ReceiverKind,
    pub receiver_id: Uuid,
    pub job_id: Option<Uuid>,
    pub price: i64,
    pub duration_days: i32,
    pub status: OfferStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn receiver(&self) -> Receiver {
        Receiver {
            kind: self.receiver_kind,
            id: self.receiver_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OfferMilestone {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_cannot_move() {
        assert!(OfferStatus::Accepted.is_terminal());
        assert!(OfferStatus::Rejected.is_terminal());
        assert!(OfferStatus::Withdrawn.is_terminal());
        assert!(!OfferStatus::Accepted.can_decline());
        assert!(!OfferStatus::Rejected.can_accept());
    }

    #[test]
    fn decline_allowed_from_review_pipeline() {
        assert!(OfferStatus::Pending.can_decline());
        assert!(OfferStatus::Reviewed.can_decline());
        assert!(OfferStatus::Interviewing.can_decline());
    }
}
