// service/order_service.rs
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        offerdb::{NewMilestone, OfferExt},
        orderdb::{CaptureClaim, OrderExt},
        userdb::UserExt,
    },
    models::{
        offermodel::{Offer, OfferStatus, Receiver, ReceiverKind},
        ordermodel::{Order, PaymentStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError, escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Offer/Order state machine. Transitions are guarded twice: a
/// state check here for a precise error message, and a conditional
/// update in the db layer that wins any race.
pub struct OrderService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
    payout_hold_days: i64,
}

impl OrderService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
        payout_hold_days: i64,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
            payout_hold_days,
        }
    }

    pub async fn create_offer(
        &self,
        sender: &User,
        receiver: Receiver,
        job_id: Option<Uuid>,
        price: i64,
        duration_days: i32,
        milestones: Vec<NewMilestone>,
    ) -> Result<Offer, ServiceError> {
        if sender.role != UserRole::Freelancer {
            return Err(ServiceError::Forbidden(sender.id));
        }

        let receiver_user = self
            .db_client
            .get_user(receiver.id)
            .await?
            .ok_or_else(|| ServiceError::Validation("Receiver does not exist".to_string()))?;

        let kind_matches = match receiver.kind {
            ReceiverKind::Employer => receiver_user.role == UserRole::Employer,
            ReceiverKind::JobSeeker => receiver_user.role == UserRole::JobSeeker,
        };
        if !kind_matches {
            return Err(ServiceError::Validation(
                "Receiver kind does not match the receiver's account".to_string(),
            ));
        }

        self.db_client
            .create_offer(sender.id, receiver, job_id, price, duration_days, milestones)
            .await
            .map_err(|e| ServiceError::from_db(e, "A live offer for this job already exists"))
    }

    /// Receiver moves an offer through the review pipeline
    /// (pending -> reviewed -> interviewing).
    pub async fn review_offer(
        &self,
        offer_id: Uuid,
        caller_id: Uuid,
        to: OfferStatus,
    ) -> Result<Offer, ServiceError> {
        if !matches!(to, OfferStatus::Reviewed | OfferStatus::Interviewing) {
            return Err(ServiceError::Validation(
                "Review stage must be reviewed or interviewing".to_string(),
            ));
        }

        let offer = self.load_offer(offer_id).await?;
        if offer.receiver_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }

        self.db_client
            .advance_offer_review(offer_id, to)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "Offer {} cannot move to {:?} from its current state",
                    offer_id, to
                ))
            })
    }

    pub async fn reject_offer(&self, offer_id: Uuid, caller_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self.load_offer(offer_id).await?;
        if offer.receiver_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }
        if !offer.status.can_decline() {
            return Err(ServiceError::InvalidState(format!(
                "Offer {} cannot be rejected in its current state",
                offer_id
            )));
        }

        self.db_client
            .decline_offer(offer_id, OfferStatus::Rejected)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!("Offer {} was already finalized", offer_id))
            })
    }

    pub async fn withdraw_offer(&self, offer_id: Uuid, caller_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self.load_offer(offer_id).await?;
        if offer.sender_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }
        if !offer.status.can_decline() {
            return Err(ServiceError::InvalidState(format!(
                "Offer {} cannot be withdrawn in its current state",
                offer_id
            )));
        }

        self.db_client
            .decline_offer(offer_id, OfferStatus::Withdrawn)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!("Offer {} was already finalized", offer_id))
            })
    }

    /// Accept an offer: the offer flips to accepted and exactly one
    /// order is created, atomically. A second acceptance either fails
    /// the conditional offer update or trips the unique index on
    /// orders.offer_id.
    pub async fn create_order(&self, offer_id: Uuid, caller_id: Uuid) -> Result<Order, ServiceError> {
        let offer = self.load_offer(offer_id).await?;

        if offer.receiver_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }
        if offer.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Offer {} is already {:?}",
                offer_id, offer.status
            )));
        }

        let order = self
            .db_client
            .create_order_for_offer(offer.id, offer.job_id, caller_id, offer.sender_id, offer.price)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => ServiceError::InvalidState(format!(
                    "Offer {} was accepted concurrently",
                    offer_id
                )),
                other => ServiceError::from_db(other, "An order already exists for this offer"),
            })?;

        self.notification_service
            .notify_order_created(order.freelancer_id, order.id);

        Ok(order)
    }

    /// Freelancer hands over the work.
    pub async fn deliver_order(&self, order_id: Uuid, caller_id: Uuid) -> Result<Order, ServiceError> {
        let order = self.load_order(order_id).await?;
        if order.freelancer_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }

        self.db_client
            .mark_order_delivered(order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "Order {} cannot be delivered in its current state",
                    order_id
                ))
            })
    }

    /// Employer-confirmed completion: capture the escrowed intent exactly
    /// once, then commit the local state change. The capture claim is a
    /// compare-and-swap, so two concurrent completion calls cannot both
    /// reach the gateway. The external capture runs outside any DB
    /// transaction; the local commit happens only after the gateway
    /// confirms.
    pub async fn complete_order(&self, order_id: Uuid, caller_id: Uuid) -> Result<Order, ServiceError> {
        let order = self.load_order(order_id).await?;
        if order.employer_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }

        let claimed = match self.db_client.claim_capture(order_id).await? {
            CaptureClaim::Claimed(order) => order,
            CaptureClaim::NotClaimed => {
                // Re-read for the precise reason.
                let current = self.load_order(order_id).await?;
                if !current.status.can_complete() {
                    return Err(ServiceError::InvalidState(format!(
                        "Order {} is {:?} and cannot be completed",
                        order_id, current.status
                    )));
                }
                if current.payment_status != PaymentStatus::EscrowHeld {
                    return Err(ServiceError::PaymentNotCaptured(order_id));
                }
                return Err(ServiceError::InvalidState(format!(
                    "A completion for order {} is already in flight",
                    order_id
                )));
            }
        };

        // Pre-capture checks: any failure here releases the claim so the
        // next attempt is eligible again.
        let prepared = self.prepare_capture(&claimed).await;
        let (intent_id, destination) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                self.release_claim_or_log(order_id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.escrow_service.capture_escrow_intent(&intent_id).await {
            self.release_claim_or_log(order_id).await;
            return Err(e);
        }

        // Money has moved. A failure past this point is a reconciliation
        // case: the claim stays set, marking the order for follow-up.
        let net = claimed.total_amount - self.escrow_service.platform_fee(claimed.total_amount);
        let release_date = Utc::now() + Duration::days(self.payout_hold_days);
        let transfer_group = format!("order_{}", claimed.id);

        let completed = self
            .db_client
            .finalize_completion(order_id, net, &destination, &transfer_group, release_date)
            .await
            .map_err(|e| {
                tracing::error!(
                    "captured intent {} for order {} but local commit failed: {} (needs manual reconciliation)",
                    intent_id,
                    order_id,
                    e
                );
                ServiceError::Other(format!("Order {} completion needs reconciliation", order_id))
            })?
            .ok_or_else(|| {
                tracing::error!(
                    "captured intent {} for order {} but the completion update matched no row (needs manual reconciliation)",
                    intent_id,
                    order_id
                );
                ServiceError::Other(format!("Order {} completion needs reconciliation", order_id))
            })?;

        self.notification_service
            .notify_order_completed(completed.freelancer_id, completed.id);

        Ok(completed)
    }

    async fn prepare_capture(&self, order: &Order) -> Result<(String, String), ServiceError> {
        let intent_id = order
            .intent_id
            .clone()
            .ok_or(ServiceError::PaymentNotCaptured(order.id))?;

        let freelancer = self
            .db_client
            .get_user(order.freelancer_id)
            .await?
            .ok_or_else(|| ServiceError::Validation("Freelancer account missing".to_string()))?;
        let destination = freelancer
            .stripe_account_id
            .clone()
            .ok_or(ServiceError::AccountNotOnboarded(order.freelancer_id))?;

        Ok((intent_id, destination))
    }

    async fn release_claim_or_log(&self, order_id: Uuid) {
        if let Err(e) = self.db_client.release_capture_claim(order_id).await {
            tracing::error!(
                "failed to release capture claim on order {}: {} (needs manual reconciliation)",
                order_id,
                e
            );
        }
    }

    async fn load_offer(&self, offer_id: Uuid) -> Result<Offer, ServiceError> {
        self.db_client
            .get_offer(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))
    }

    async fn load_order(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        self.db_client
            .get_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))
    }
}
