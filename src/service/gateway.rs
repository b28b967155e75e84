// service/gateway.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Gateway rejected the request ({code}): {message}")]
    Api { code: String, message: String },

    /// The intent was captured by an earlier call. Callers retrying a
    /// completion can treat this as success.
    #[error("Payment intent already captured")]
    AlreadyCaptured,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Http(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EscrowIntent {
    pub id: String,
    pub client_secret: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CapturedIntent {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResult {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountStatus {
    pub id: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

/// Thin client over the payment processor's REST API. Every mutating
/// call carries an Idempotency-Key derived from the local correlation
/// id, so an ambiguous timeout can be retried without moving money twice.
pub struct PaymentGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl PaymentGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: config.stripe_secret_key.clone(),
        }
    }

    /// Create a manual-capture payment intent sized to the order total,
    /// with the platform fee split and the freelancer's connected
    /// account as transfer destination. Funds stay in escrow until an
    /// explicit capture.
    pub async fn create_escrow_intent(
        &self,
        amount_cents: i64,
        application_fee_cents: i64,
        order_id: Uuid,
        destination_account_id: &str,
    ) -> Result<EscrowIntent, GatewayError> {
        let order = order_id.to_string();
        let amount = amount_cents.to_string();
        let fee = application_fee_cents.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("amount", &amount),
            ("currency", "usd"),
            ("capture_method", "manual"),
            ("application_fee_amount", &fee),
            ("transfer_data[destination]", destination_account_id),
            ("transfer_group", &order),
            ("metadata[purpose]", "order-payment"),
            ("metadata[orderId]", &order),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let body = self
            .post(
                "/payment_intents",
                &params,
                Some(&format!("escrow-intent-{}", order_id)),
            )
            .await?;

        Ok(EscrowIntent {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            client_secret: body["client_secret"].as_str().unwrap_or_default().to_string(),
            status: body["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// Capture a previously authorized intent. A gateway-side
    /// "already captured" rejection is reported as AlreadyCaptured.
    pub async fn capture_intent(&self, intent_id: &str) -> Result<CapturedIntent, GatewayError> {
        let body = self
            .post(
                &format!("/payment_intents/{}/capture", intent_id),
                &[],
                Some(&format!("capture-{}", intent_id)),
            )
            .await?;

        Ok(CapturedIntent {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            status: body["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// Move funds to a connected account, tagged with the transfer-group
    /// correlation string for traceability.
    pub async fn create_transfer(
        &self,
        amount_cents: i64,
        destination_account_id: &str,
        transfer_group: &str,
        payout_id: Uuid,
    ) -> Result<TransferResult, GatewayError> {
        let amount = amount_cents.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("amount", &amount),
            ("currency", "usd"),
            ("destination", destination_account_id),
            ("transfer_group", transfer_group),
        ];

        let body = self
            .post(
                "/transfers",
                &params,
                Some(&format!("payout-{}", payout_id)),
            )
            .await?;

        Ok(TransferResult {
            id: body["id"].as_str().unwrap_or_default().to_string(),
        })
    }

    pub async fn retrieve_intent(&self, intent_id: &str) -> Result<EscrowIntent, GatewayError> {
        let body = self.get(&format!("/payment_intents/{}", intent_id)).await?;
        Ok(EscrowIntent {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            client_secret: body["client_secret"].as_str().unwrap_or_default().to_string(),
            status: body["status"].as_str().unwrap_or_default().to_string(),
        })
    }

    pub async fn retrieve_session(&self, session_id: &str) -> Result<Value, GatewayError> {
        self.get(&format!("/checkout/sessions/{}", session_id)).await
    }

    pub async fn retrieve_subscription(&self, sub_id: &str) -> Result<Value, GatewayError> {
        self.get(&format!("/subscriptions/{}", sub_id)).await
    }

    pub async fn retrieve_account(&self, account_id: &str) -> Result<AccountStatus, GatewayError> {
        let body = self.get(&format!("/accounts/{}", account_id)).await?;
        Ok(AccountStatus {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            charges_enabled: body["charges_enabled"].as_bool().unwrap_or(false),
            payouts_enabled: body["payouts_enabled"].as_bool().unwrap_or(false),
            details_submitted: body["details_submitted"].as_bool().unwrap_or(false),
        })
    }

    async fn post(
        &self,
        path: &str,
        params: &[(&str, &str)],
        idempotency_key: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let form_body = serde_urlencoded::to_string(params)
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let mut request = self
            .client
            .post(format!("{}{}", STRIPE_API_BASE, path))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form_body);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Self::api_error(&body))
        }
    }

    async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .get(format!("{}{}", STRIPE_API_BASE, path))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Self::api_error(&body))
        }
    }

    fn api_error(body: &Value) -> GatewayError {
        let code = body["error"]["code"].as_str().unwrap_or("unknown").to_string();
        let message = body["error"]["message"].as_str().unwrap_or("").to_string();

        if code == "payment_intent_unexpected_state" && message.contains("already") {
            return GatewayError::AlreadyCaptured;
        }

        GatewayError::Api { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn already_captured_is_recognized() {
        let body = json!({
            "error": {
                "code": "payment_intent_unexpected_state",
                "message": "This PaymentIntent could not be captured because it has already been captured."
            }
        });
        assert!(matches!(
            PaymentGateway::api_error(&body),
            GatewayError::AlreadyCaptured
        ));
    }

    #[test]
    fn other_api_errors_carry_code_and_message() {
        let body = json!({
            "error": { "code": "balance_insufficient", "message": "Insufficient funds." }
        });
        match PaymentGateway::api_error(&body) {
            GatewayError::Api { code, message } => {
                assert_eq!(code, "balance_insufficient");
                assert_eq!(message, "Insufficient funds.");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
