// service/background_jobs.rs
use std::sync::Arc;
use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Start the scheduled payout release job. Fires once per day; the
/// payout service serializes runs, so an overlapping trigger (or an
/// operator invoking the sweep by hand) is harmless.
pub async fn start_payout_release_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(86400)); // Run daily

    loop {
        interval.tick().await;

        tracing::info!("Running scheduled payout release at {}", Utc::now());

        match app_state.payout_service.run_scheduled_payouts().await {
            Ok(summary) => tracing::info!(
                "Payout release job completed: {} released, {} failed",
                summary.released,
                summary.failed
            ),
            Err(e) => tracing::error!("Payout release job failed: {}", e),
        }
    }
}
