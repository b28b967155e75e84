// service/webhook_service.rs
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient, orderdb::OrderExt, transactiondb::TransactionExt, userdb::UserExt,
    },
    models::transactionmodel::{TransactionPurpose, TransactionStatus},
    service::{
        error::ServiceError, notification_service::NotificationService,
        payout_service::PayoutService, subscription_service::SubscriptionService,
    },
};

/// Signature timestamps older than this are rejected to blunt replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// What a handled event did, for logging and tests. Duplicates and
/// not-applicable events are acknowledged, never errored: the gateway
/// retries non-2xx responses and retries are how double-processing
/// sneaks in.
#[derive(Debug, PartialEq)]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Ignored,
}

/// Verify a `t=...,v1=...` signature header: HMAC-SHA256 over
/// `"{t}.{payload}"`, compared in constant time.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut provided_sig: Option<String> = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => provided_sig = Some(value.to_string()),
            _ => {}
        }
    }

    let (Some(timestamp), Some(provided_sig)) = (timestamp, provided_sig) else {
        return false;
    };

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    ConstantTimeEq::ct_eq(provided_sig.as_bytes(), expected.as_bytes()).into()
}

/// Applies gateway events to local state exactly once. Every handler
/// checks a correlation id (intent, session or invoice id already on a
/// transaction) before mutating anything.
pub struct WebhookService {
    db_client: Arc<DBClient>,
    payout_service: Arc<PayoutService>,
    subscription_service: Arc<SubscriptionService>,
    notification_service: Arc<NotificationService>,
}

impl WebhookService {
    pub fn new(
        db_client: Arc<DBClient>,
        payout_service: Arc<PayoutService>,
        subscription_service: Arc<SubscriptionService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            payout_service,
            subscription_service,
            notification_service,
        }
    }

    pub async fn handle_event(&self, event: &Value) -> Result<WebhookOutcome, ServiceError> {
        let event_type = event["type"].as_str().unwrap_or_default();
        let object = &event["data"]["object"];

        match event_type {
            "payment_intent.succeeded" | "payment_intent.amount_capturable_updated" => {
                self.handle_payment(object).await
            }
            "account.updated" => self.handle_account_updated(object).await,
            "invoice.payment_succeeded" => self.handle_invoice_paid(object).await,
            other => {
                tracing::info!("unhandled gateway event: {}", other);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn handle_payment(&self, object: &Value) -> Result<WebhookOutcome, ServiceError> {
        let intent_id = object["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("Missing intent id in event".to_string()))?;
        let purpose_tag = object["metadata"]["purpose"].as_str().unwrap_or_default();

        let Some(purpose) = TransactionPurpose::from_metadata_tag(purpose_tag) else {
            tracing::info!("payment {} carries unknown purpose '{}'", intent_id, purpose_tag);
            return Ok(WebhookOutcome::Ignored);
        };

        match purpose {
            TransactionPurpose::OrderPayment => self.apply_order_payment(intent_id).await,
            TransactionPurpose::OrderBonus => self.apply_order_bonus(intent_id, object).await,
            TransactionPurpose::Subscription => self.apply_subscription(intent_id, object).await,
            TransactionPurpose::ResumePurchase => self.apply_resume_purchase(intent_id, object).await,
            TransactionPurpose::Payout => Ok(WebhookOutcome::Ignored),
        }
    }

    /// Escrow charge confirmed: order payment_pending -> in_progress,
    /// transaction -> escrow_held, referenced job -> filled.
    async fn apply_order_payment(&self, intent_id: &str) -> Result<WebhookOutcome, ServiceError> {
        if let Some(txn) = self.db_client.get_transaction_by_intent(intent_id).await? {
            if txn.status.is_settled() {
                tracing::info!("payment {} already applied, acknowledging replay", intent_id);
                return Ok(WebhookOutcome::Duplicate);
            }
        }

        let Some(order) = self.db_client.get_order_by_intent(intent_id).await? else {
            tracing::warn!("payment {} references no known order", intent_id);
            return Ok(WebhookOutcome::Ignored);
        };

        match self.db_client.mark_order_in_progress(order.id).await? {
            Some(order) => {
                self.notification_service
                    .notify_payment_secured(order.freelancer_id, order.id);
                Ok(WebhookOutcome::Applied)
            }
            None => Ok(WebhookOutcome::Duplicate),
        }
    }

    /// Tip/bonus payment: record the transaction and queue the net
    /// amount as a delayed payout.
    async fn apply_order_bonus(
        &self,
        intent_id: &str,
        object: &Value,
    ) -> Result<WebhookOutcome, ServiceError> {
        let freelancer_id = Self::metadata_uuid(object, "freelancerId")
            .ok_or_else(|| ServiceError::Validation("Bonus event missing freelancerId".to_string()))?;
        let order_id = Self::metadata_uuid(object, "orderId");
        let gross = object["amount_received"]
            .as_i64()
            .or_else(|| object["amount"].as_i64())
            .ok_or_else(|| ServiceError::Validation("Bonus event missing amount".to_string()))?;

        let txn = match self.db_client.get_transaction_by_intent(intent_id).await? {
            Some(existing) if existing.status.is_settled() => {
                tracing::info!("bonus {} already applied, acknowledging replay", intent_id);
                return Ok(WebhookOutcome::Duplicate);
            }
            Some(existing) => existing,
            None => {
                match self
                    .db_client
                    .create_transaction(
                        freelancer_id,
                        order_id,
                        TransactionPurpose::OrderBonus,
                        gross,
                        Some(intent_id.to_string()),
                        None,
                        Some(object.clone()),
                    )
                    .await
                {
                    Ok(txn) => txn,
                    Err(e) => match ServiceError::from_db(e, "bonus transaction") {
                        // A concurrent delivery of the same event won the
                        // insert; treat ours as the replay.
                        ServiceError::Duplicate(_) => return Ok(WebhookOutcome::Duplicate),
                        other => return Err(other),
                    },
                }
            }
        };

        match self
            .payout_service
            .enqueue_tip(freelancer_id, gross, Some(txn.id), order_id)
            .await
        {
            Ok(_) => Ok(WebhookOutcome::Applied),
            Err(ServiceError::Database(sqlx::Error::RowNotFound)) => {
                // The linked transaction was settled between our check and
                // the enqueue: a replay raced us.
                Ok(WebhookOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_subscription(
        &self,
        intent_id: &str,
        object: &Value,
    ) -> Result<WebhookOutcome, ServiceError> {
        let user_id = Self::metadata_uuid(object, "userId")
            .ok_or_else(|| ServiceError::Validation("Subscription event missing userId".to_string()))?;
        let plan_id = Self::metadata_uuid(object, "planId")
            .ok_or_else(|| ServiceError::Validation("Subscription event missing planId".to_string()))?;
        let stripe_subscription_id = object["metadata"]["subscriptionId"]
            .as_str()
            .map(|s| s.to_string());
        let amount = object["amount_received"]
            .as_i64()
            .or_else(|| object["amount"].as_i64())
            .unwrap_or(0);

        let txn = match self
            .db_client
            .create_transaction(
                user_id,
                None,
                TransactionPurpose::Subscription,
                amount,
                Some(intent_id.to_string()),
                None,
                None,
            )
            .await
        {
            Ok(txn) => txn,
            Err(e) => match ServiceError::from_db(e, "subscription transaction") {
                ServiceError::Duplicate(_) => {
                    tracing::info!("subscription purchase {} already applied", intent_id);
                    return Ok(WebhookOutcome::Duplicate);
                }
                other => return Err(other),
            },
        };

        self.db_client
            .settle_transaction(txn.id, TransactionStatus::Completed)
            .await?;
        self.subscription_service
            .activate_plan(user_id, plan_id, stripe_subscription_id)
            .await?;

        Ok(WebhookOutcome::Applied)
    }

    async fn apply_resume_purchase(
        &self,
        intent_id: &str,
        object: &Value,
    ) -> Result<WebhookOutcome, ServiceError> {
        let user_id = Self::metadata_uuid(object, "userId")
            .ok_or_else(|| ServiceError::Validation("Purchase event missing userId".to_string()))?;
        let amount = object["amount_received"]
            .as_i64()
            .or_else(|| object["amount"].as_i64())
            .unwrap_or(0);

        let txn = match self
            .db_client
            .create_transaction(
                user_id,
                None,
                TransactionPurpose::ResumePurchase,
                amount,
                Some(intent_id.to_string()),
                None,
                None,
            )
            .await
        {
            Ok(txn) => txn,
            Err(e) => match ServiceError::from_db(e, "purchase transaction") {
                ServiceError::Duplicate(_) => return Ok(WebhookOutcome::Duplicate),
                other => return Err(other),
            },
        };

        self.db_client
            .settle_transaction(txn.id, TransactionStatus::Completed)
            .await?;

        Ok(WebhookOutcome::Applied)
    }

    /// Connected-account readiness: onboarded iff charges, payouts and
    /// submitted details are all in place. The flag tracks the gateway's
    /// view in both directions.
    async fn handle_account_updated(&self, object: &Value) -> Result<WebhookOutcome, ServiceError> {
        let account_id = object["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("Account event missing id".to_string()))?;

        let ready = object["charges_enabled"].as_bool().unwrap_or(false)
            && object["payouts_enabled"].as_bool().unwrap_or(false)
            && object["details_submitted"].as_bool().unwrap_or(false);

        match self.db_client.set_onboarded(account_id, ready).await? {
            Some(user) => {
                tracing::info!("account {} onboarded={} for user {}", account_id, ready, user.id);
                Ok(WebhookOutcome::Applied)
            }
            None => {
                tracing::info!("account {} matches no user, ignoring", account_id);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Renewal invoice: extend the subscriber's window by one plan
    /// duration, idempotent on the invoice id.
    async fn handle_invoice_paid(&self, object: &Value) -> Result<WebhookOutcome, ServiceError> {
        let invoice_id = object["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("Invoice event missing id".to_string()))?;
        let Some(subscription_id) = object["subscription"].as_str() else {
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(user) = self.db_client.get_user_by_subscription(subscription_id).await? else {
            tracing::info!("invoice {} references unknown subscription {}", invoice_id, subscription_id);
            return Ok(WebhookOutcome::Ignored);
        };

        let amount = object["amount_paid"].as_i64().unwrap_or(0);
        match self
            .db_client
            .create_transaction(
                user.id,
                None,
                TransactionPurpose::Subscription,
                amount,
                None,
                Some(invoice_id.to_string()),
                None,
            )
            .await
        {
            Ok(txn) => {
                self.db_client
                    .settle_transaction(txn.id, TransactionStatus::Completed)
                    .await?;
            }
            Err(e) => match ServiceError::from_db(e, "invoice transaction") {
                ServiceError::Duplicate(_) => {
                    tracing::info!("invoice {} already applied", invoice_id);
                    return Ok(WebhookOutcome::Duplicate);
                }
                other => return Err(other),
            },
        }

        self.subscription_service
            .renew_by_subscription(subscription_id)
            .await?;

        Ok(WebhookOutcome::Applied)
    }

    fn metadata_uuid(object: &Value, key: &str) -> Option<Uuid> {
        object["metadata"][key]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = Utc::now().timestamp();
        let header = sign(payload, "whsec_test", now);
        assert!(verify_signature(payload, &header, "whsec_test", now));
    }

    #[test]
    fn tampered_payload_fails() {
        let now = Utc::now().timestamp();
        let header = sign(br#"{"a":1}"#, "whsec_test", now);
        assert!(!verify_signature(br#"{"a":2}"#, &header, "whsec_test", now));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        let header = sign(payload, "whsec_a", now);
        assert!(!verify_signature(payload, &header, "whsec_b", now));
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        let header = sign(payload, "whsec_test", now - SIGNATURE_TOLERANCE_SECS - 1);
        assert!(!verify_signature(payload, &header, "whsec_test", now));
    }

    #[test]
    fn malformed_header_fails() {
        assert!(!verify_signature(b"{}", "not-a-header", "whsec_test", 0));
        assert!(!verify_signature(b"{}", "t=abc,v1=", "whsec_test", 0));
    }
}
