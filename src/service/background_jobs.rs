// service/background_jobs.rs
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Background reconciliation for webhook events that were acknowledged to
/// the provider but failed internally. Always-ack means the provider will
/// never retry for us, so this job is the only path back to consistency.
pub async fn start_webhook_reconciliation_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(300));

    loop {
        interval.tick().await;

        match app_state.ingestor.reprocess_failed().await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Reconciliation job retried {} webhook events", count),
            Err(e) => tracing::error!("Reconciliation job failed: {}", e),
        }
    }
}
