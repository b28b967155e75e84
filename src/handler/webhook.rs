// handler/webhook.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;

use crate::{
    error::HttpError,
    service::webhook_service::{verify_signature, WebhookOutcome},
    AppState,
};

pub fn webhook_handler() -> Router {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// Signed event receiver. A bad signature is rejected outright; once the
/// signature checks out, every other failure is logged and acknowledged
/// with 200 so the gateway does not retry — retries of a half-applied
/// event are how duplicate side effects happen.
pub async fn stripe_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new("Missing gateway signature".to_string(), StatusCode::BAD_REQUEST)
        })?;

    let webhook_secret = &app_state.env.stripe_webhook_secret;

    if !verify_signature(&body, signature, webhook_secret, Utc::now().timestamp()) {
        tracing::warn!("Invalid gateway webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| HttpError::bad_request("Malformed webhook payload"))?;

    let event_type = event["type"].as_str().unwrap_or("unknown").to_string();

    match app_state.webhook_service.handle_event(&event).await {
        Ok(WebhookOutcome::Applied) => {
            tracing::info!("webhook {} applied", event_type);
        }
        Ok(WebhookOutcome::Duplicate) => {
            tracing::info!("webhook {} was a recognized duplicate", event_type);
        }
        Ok(WebhookOutcome::Ignored) => {}
        Err(e) => {
            // Acknowledged anyway; operators watch the logs.
            tracing::error!("webhook {} failed after signature check: {}", event_type, e);
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}
