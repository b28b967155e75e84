// service/notification_service.rs
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    cache::{CacheHelper, NOTIFICATION_QUEUE_KEY},
    db::DBClient,
};

/// Fire-and-forget notification sink. The durable record is the DB row;
/// queue delivery rides a Redis list drained by an external worker.
/// Failures on either path are logged and never propagate into the
/// money-flow transaction that triggered them.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

#[derive(Debug, Serialize)]
struct QueuedNotification<'a> {
    user_id: Uuid,
    kind: &'a str,
    payload: serde_json::Value,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub fn dispatch(&self, user_id: Uuid, kind: &'static str, payload: serde_json::Value) {
        let db_client = self.db_client.clone();
        let queued_payload = payload.clone();

        tokio::spawn(async move {
            let inserted = sqlx::query(
                r#"
                INSERT INTO notifications (user_id, kind, payload)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(user_id)
            .bind(kind)
            .bind(&payload)
            .execute(&db_client.pool)
            .await;

            if let Err(e) = inserted {
                tracing::warn!("notification insert failed for {}: {}", user_id, e);
            }

            if let Some(redis) = &db_client.redis_client {
                let event = QueuedNotification {
                    user_id,
                    kind,
                    payload: queued_payload,
                };
                if let Err(e) = CacheHelper::push_list(redis, NOTIFICATION_QUEUE_KEY, &event).await {
                    tracing::warn!("notification enqueue failed for {}: {}", user_id, e);
                }
            }
        });
    }

    pub fn notify_offer_received(&self, receiver_id: Uuid, offer_id: Uuid) {
        self.dispatch(
            receiver_id,
            "offer_received",
            serde_json::json!({ "offer_id": offer_id }),
        );
    }

    pub fn notify_order_created(&self, freelancer_id: Uuid, order_id: Uuid) {
        self.dispatch(
            freelancer_id,
            "order_created",
            serde_json::json!({ "order_id": order_id }),
        );
    }

    pub fn notify_payment_secured(&self, freelancer_id: Uuid, order_id: Uuid) {
        self.dispatch(
            freelancer_id,
            "payment_secured",
            serde_json::json!({ "order_id": order_id }),
        );
    }

    pub fn notify_order_completed(&self, freelancer_id: Uuid, order_id: Uuid) {
        self.dispatch(
            freelancer_id,
            "order_completed",
            serde_json::json!({ "order_id": order_id }),
        );
    }

    pub fn notify_payout_released(&self, freelancer_id: Uuid, payout_id: Uuid, amount: i64) {
        self.dispatch(
            freelancer_id,
            "payout_released",
            serde_json::json!({ "payout_id": payout_id, "amount": amount }),
        );
    }
}
