use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::infrastructure::config::CleanupConfig;

/// Periodically delete rooms idle for longer than the configured TTL.
pub async fn room_sweeper(app: Arc<App>, config: CleanupConfig, cancel: CancellationToken) {
    tracing::info!(
        ttl_minutes = config.room_ttl_minutes,
        interval_seconds = config.interval_seconds,
        "Starting idle room sweeper"
    );
    let ttl = config.room_ttl();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Idle room sweeper shutting down");
                break;
            }
            _ = tokio::time::sleep(config.interval()) => {}
        }

        match app.use_cases.sweep.execute(ttl).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "Swept idle rooms"),
            Err(e) => tracing::warn!(error = %e, "Failed to sweep idle rooms"),
        }
    }
}
