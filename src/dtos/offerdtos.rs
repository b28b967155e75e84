// dtos/offerdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::offermodel::{Offer, OfferStatus, ReceiverKind},
    utils::currency::cents_to_usd,
};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct MilestoneDto {
    #[validate(length(min = 1, max = 200, message = "Milestone name is required"))]
    pub name: String,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0.01, message = "Milestone amount must be positive"))]
    pub amount: f64,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateOfferDto {
    pub receiver_kind: ReceiverKind,

    pub receiver_id: Uuid,

    pub job_id: Option<Uuid>,

    #[validate(range(min = 1.0, max = 1000000.0, message = "Price must be between $1 and $1,000,000"))]
    pub price: f64,

    #[validate(range(min = 1, max = 365, message = "Duration must be between 1 and 365 days"))]
    pub duration_days: i32,

    #[validate]
    pub milestones: Option<Vec<MilestoneDto>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewOfferDto {
    pub stage: OfferStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OfferResponseDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_kind: ReceiverKind,
    pub receiver_id: Uuid,
    pub job_id: Option<Uuid>,
    pub price: f64,
    pub duration_days: i32,
    pub status: OfferStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Offer> for OfferResponseDto {
    fn from(offer: Offer) -> Self {
        Self {
            id: offer.id,
            sender_id: offer.sender_id,
            receiver_kind: offer.receiver_kind,
            receiver_id: offer.receiver_id,
            job_id: offer.job_id,
            price: cents_to_usd(offer.price),
            duration_days: offer.duration_days,
            status: offer.status,
            created_at: offer.created_at,
        }
    }
}
