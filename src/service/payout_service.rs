// service/payout_service.rs
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, payoutdb::PayoutExt, userdb::UserExt},
    models::payoutmodel::{PendingPayout, PayoutType},
    service::{
        error::ServiceError, gateway::PaymentGateway,
        notification_service::NotificationService,
    },
    utils::currency::percent_of,
};

#[derive(Debug, Default, serde::Serialize)]
pub struct PayoutRunSummary {
    pub due: usize,
    pub released: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Pending payout queue and its scheduled batch runner.
pub struct PayoutService {
    db_client: Arc<DBClient>,
    gateway: Arc<PaymentGateway>,
    notification_service: Arc<NotificationService>,
    tip_commission_percent: f64,
    payout_hold_days: i64,
    /// Serializes batch runs: two concurrent invocations must not sweep
    /// the same payout set.
    run_lock: Mutex<()>,
}

impl PayoutService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<PaymentGateway>,
        notification_service: Arc<NotificationService>,
        tip_commission_percent: f64,
        payout_hold_days: i64,
    ) -> Self {
        Self {
            db_client,
            gateway,
            notification_service,
            tip_commission_percent,
            payout_hold_days,
            run_lock: Mutex::new(()),
        }
    }

    /// Net amount after the platform's cut on a tip/bonus.
    pub fn tip_net(&self, gross_cents: i64) -> i64 {
        gross_cents - percent_of(gross_cents, self.tip_commission_percent)
    }

    /// Queue a tip/bonus for delayed release. The hold window is fixed
    /// at creation and never rescheduled.
    pub async fn enqueue_tip(
        &self,
        freelancer_id: Uuid,
        gross_amount: i64,
        transaction_id: Option<Uuid>,
        order_id: Option<Uuid>,
    ) -> Result<PendingPayout, ServiceError> {
        let freelancer = self
            .db_client
            .get_user(freelancer_id)
            .await?
            .ok_or_else(|| ServiceError::Validation("Freelancer account missing".to_string()))?;
        let destination = freelancer
            .stripe_account_id
            .as_deref()
            .ok_or(ServiceError::AccountNotOnboarded(freelancer_id))?;

        let net = self.tip_net(gross_amount);
        let release_date = Utc::now() + Duration::days(self.payout_hold_days);
        let transfer_group = match order_id {
            Some(order_id) => format!("order_{}", order_id),
            None => format!("tip_{}", freelancer_id),
        };

        let payout = self
            .db_client
            .enqueue_payout(
                freelancer_id,
                PayoutType::OrderTip,
                net,
                destination,
                &transfer_group,
                release_date,
                transaction_id,
                order_id,
            )
            .await?;

        Ok(payout)
    }

    /// Daily batch entry point. Sweeps every due, untransferred payout;
    /// each payout is processed independently so one failure cannot
    /// abort the batch. Invocations are serialized; a second concurrent
    /// call returns an empty summary.
    pub async fn run_scheduled_payouts(&self) -> Result<PayoutRunSummary, ServiceError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::warn!("payout run already in progress, skipping this trigger");
            return Ok(PayoutRunSummary::default());
        };

        let due = self.db_client.get_due_payouts(Utc::now()).await?;
        let mut summary = PayoutRunSummary {
            due: due.len(),
            ..Default::default()
        };

        for payout in due {
            match self.release_one(&payout).await {
                Ok(true) => summary.released += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    // Leave the payout untouched; it stays eligible for
                    // the next run.
                    tracing::error!("payout {} failed, will retry next run: {}", payout.id, e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "payout run finished: {} due, {} released, {} failed, {} skipped",
            summary.due,
            summary.released,
            summary.failed,
            summary.skipped
        );

        // Visibility for property: pending clearance must equal the sum
        // of outstanding payouts per freelancer.
        match self.db_client.pending_clearance_mismatches().await {
            Ok(mismatches) => {
                for m in mismatches {
                    tracing::warn!(
                        "ledger drift for freelancer {}: pending_clearence={} outstanding_payouts={}",
                        m.freelancer_id,
                        m.pending_clearence,
                        m.outstanding_payouts
                    );
                }
            }
            Err(e) => tracing::warn!("clearance reconciliation query failed: {}", e),
        }

        Ok(summary)
    }

    /// Transfer first, commit after: the external call confirms before
    /// the local transaction flips `transferred` and mutates the ledger
    /// as one unit. Returns Ok(false) when a racing writer settled the
    /// payout between the due-query and the flip.
    async fn release_one(&self, payout: &PendingPayout) -> Result<bool, ServiceError> {
        self.gateway
            .create_transfer(
                payout.amount,
                &payout.destination_account_id,
                &payout.transfer_group,
                payout.id,
            )
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let settled = self
            .db_client
            .settle_payout(payout.id)
            .await
            .map_err(|e| {
                tracing::error!(
                    "transferred payout {} but local settle failed: {} (needs manual reconciliation)",
                    payout.id,
                    e
                );
                e
            })?;

        match settled {
            Some(settled) => {
                self.notification_service.notify_payout_released(
                    settled.freelancer_id,
                    settled.id,
                    settled.amount,
                );
                Ok(true)
            }
            None => {
                tracing::warn!(
                    "payout {} was settled by a concurrent writer after our transfer; flagging for reconciliation",
                    payout.id
                );
                Ok(false)
            }
        }
    }

    pub async fn list_for_freelancer(
        &self,
        freelancer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PendingPayout>, ServiceError> {
        Ok(self
            .db_client
            .list_payouts_for_freelancer(freelancer_id, limit, offset)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use sqlx::PgPool;

    fn service(tip_commission_percent: f64) -> PayoutService {
        let pool = PgPool::connect_lazy("postgres://localhost/workvault").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let config = Config {
            database_url: "postgres://localhost/workvault".to_string(),
            redis_url: None,
            app_url: "http://localhost:8000".to_string(),
            jwt_secret: "secret".to_string(),
            port: 8000,
            stripe_secret_key: "sk_test_secret_key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
            platform_fee_percent: 6.8,
            tip_commission_percent,
            payout_hold_days: 7,
        };
        let gateway = Arc::new(PaymentGateway::new(&config));
        let notification_service = Arc::new(NotificationService::new(db_client.clone()));
        PayoutService::new(db_client, gateway, notification_service, tip_commission_percent, 7)
    }

    #[tokio::test]
    async fn tip_commission_reduces_net() {
        let svc = service(20.0);
        // $50 tip with 20% commission nets $40
        assert_eq!(svc.tip_net(5_000), 4_000);
        // Rounds to the nearest cent
        assert_eq!(svc.tip_net(999), 799);
    }

    #[tokio::test]
    async fn zero_commission_passes_gross_through() {
        let svc = service(0.0);
        assert_eq!(svc.tip_net(5_000), 5_000);
    }
}
