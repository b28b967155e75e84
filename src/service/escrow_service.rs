// service/escrow_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, orderdb::OrderExt, transactiondb::TransactionExt, userdb::UserExt},
    models::{
        ordermodel::{Order, PaymentStatus},
        transactionmodel::TransactionPurpose,
    },
    service::{
        error::ServiceError,
        gateway::{GatewayError, PaymentGateway},
    },
    utils::currency::percent_of,
};

#[derive(Debug, Clone, serde::Serialize)]
pub struct EscrowIntentHandle {
    pub intent_id: String,
    pub client_secret: String,
}

/// Creates and captures the manual-capture payment intent backing an
/// order. Creation is idempotent on `order.intent_id`: a retried client
/// request gets the existing intent's client secret back instead of a
/// second authorization.
pub struct EscrowService {
    db_client: Arc<DBClient>,
    gateway: Arc<PaymentGateway>,
    platform_fee_percent: f64,
}

impl EscrowService {
    pub fn new(db_client: Arc<DBClient>, gateway: Arc<PaymentGateway>, platform_fee_percent: f64) -> Self {
        Self {
            db_client,
            gateway,
            platform_fee_percent,
        }
    }

    pub fn platform_fee(&self, amount_cents: i64) -> i64 {
        percent_of(amount_cents, self.platform_fee_percent)
    }

    pub async fn create_escrow_intent(
        &self,
        order: &Order,
        caller_id: Uuid,
    ) -> Result<EscrowIntentHandle, ServiceError> {
        if order.employer_id != caller_id {
            return Err(ServiceError::Forbidden(caller_id));
        }

        // Retried request: hand back the existing intent.
        if let Some(intent_id) = &order.intent_id {
            let existing = self
                .gateway
                .retrieve_intent(intent_id)
                .await
                .map_err(|e| ServiceError::Gateway(e.to_string()))?;
            return Ok(EscrowIntentHandle {
                intent_id: existing.id,
                client_secret: existing.client_secret,
            });
        }

        if order.payment_status != PaymentStatus::PaymentPending {
            return Err(ServiceError::InvalidState(format!(
                "Order {} already has escrow funds held",
                order.id
            )));
        }

        let freelancer = self
            .db_client
            .get_user(order.freelancer_id)
            .await?
            .ok_or_else(|| ServiceError::Validation("Freelancer account missing".to_string()))?;
        let destination = freelancer
            .stripe_account_id
            .as_deref()
            .filter(|_| freelancer.onboarded)
            .ok_or(ServiceError::AccountNotOnboarded(order.freelancer_id))?;

        let fee = self.platform_fee(order.total_amount);
        let intent = self
            .gateway
            .create_escrow_intent(order.total_amount, fee, order.id, destination)
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        // Conditional store: if a concurrent request won, use its intent.
        let stored = self.db_client.set_order_intent(order.id, &intent.id).await?;
        if stored.is_none() {
            let current = self
                .db_client
                .get_order(order.id)
                .await?
                .and_then(|o| o.intent_id);
            if let Some(existing_id) = current {
                if existing_id != intent.id {
                    let existing = self
                        .gateway
                        .retrieve_intent(&existing_id)
                        .await
                        .map_err(|e| ServiceError::Gateway(e.to_string()))?;
                    return Ok(EscrowIntentHandle {
                        intent_id: existing.id,
                        client_secret: existing.client_secret,
                    });
                }
            }
        }

        // Pending transaction keyed by the intent id; the unique index
        // makes a duplicate insert from a racing request benign.
        if let Err(e) = self
            .db_client
            .create_transaction(
                order.employer_id,
                Some(order.id),
                TransactionPurpose::OrderPayment,
                order.total_amount,
                Some(intent.id.clone()),
                None,
                None,
            )
            .await
        {
            match ServiceError::from_db(e, "transaction for intent") {
                ServiceError::Duplicate(_) => {}
                other => return Err(other),
            }
        }

        Ok(EscrowIntentHandle {
            intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Capture the held funds. Must be called at most once per intent;
    /// the order-state claim in the completion flow enforces that. A
    /// gateway-side AlreadyCaptured is not an error for a retrying
    /// caller.
    pub async fn capture_escrow_intent(&self, intent_id: &str) -> Result<(), ServiceError> {
        match self.gateway.capture_intent(intent_id).await {
            Ok(_) => Ok(()),
            Err(GatewayError::AlreadyCaptured) => {
                tracing::info!("intent {} was already captured, treating as success", intent_id);
                Ok(())
            }
            Err(e) => Err(ServiceError::Gateway(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use sqlx::PgPool;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/workvault".to_string(),
            redis_url: None,
            app_url: "http://localhost:8000".to_string(),
            jwt_secret: "secret".to_string(),
            port: 8000,
            stripe_secret_key: "sk_test_secret_key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
            platform_fee_percent: 6.8,
            tip_commission_percent: 20.0,
            payout_hold_days: 7,
        }
    }

    #[tokio::test]
    async fn platform_fee_rounds_to_nearest_cent() {
        let pool = PgPool::connect_lazy("postgres://localhost/workvault").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let gateway = Arc::new(PaymentGateway::new(&test_config()));
        let svc = EscrowService::new(db_client, gateway, 6.8);

        // 6.8% of $500.00
        assert_eq!(svc.platform_fee(50_000), 3_400);
        // 6.8% of $19.99 = 135.932 cents -> 136
        assert_eq!(svc.platform_fee(1_999), 136);
    }
}
