// dtos/orderdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::ordermodel::{Order, OrderStatus, PaymentStatus},
    utils::currency::cents_to_usd,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponseDto {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub job_id: Option<Uuid>,
    pub employer_id: Uuid,
    pub freelancer_id: Uuid,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponseDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            offer_id: order.offer_id,
            job_id: order.job_id,
            employer_id: order.employer_id,
            freelancer_id: order.freelancer_id,
            total_amount: cents_to_usd(order.total_amount),
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentResponseDto {
    pub intent_id: String,
    pub client_secret: String,
}
