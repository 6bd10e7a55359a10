//! Background cleanup worker for expired sessions and used magic links.

use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cleanup configuration.
pub struct CleanupConfig {
    /// Interval between cleanup runs.
    pub interval: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Run a single cleanup cycle.
pub async fn cleanup_once(pool: &SqlitePool) {
    match crate::db::delete_expired_sessions(pool).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(expired_sessions = count, "Cleaned up expired sessions");
            }
        }
        Err(e) => {
            tracing::error!("Failed to delete expired sessions: {e:#}");
        }
    }

    match crate::db::delete_stale_magic_links(pool).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(stale_magic_links = count, "Cleaned up magic links");
            }
        }
        Err(e) => {
            tracing::error!("Failed to delete stale magic links: {e:#}");
        }
    }
}

/// Run the cleanup worker.
/// Cleans up immediately on start, then at the configured interval, until the
/// cancellation token fires.
pub async fn run_cleanup_worker(
    pool: SqlitePool,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Starting cleanup worker"
    );

    cleanup_once(&pool).await;

    let mut interval = tokio::time::interval(config.interval);
    interval.tick().await; // First tick completes immediately

    loop {
        tokio::select! {
            _ = interval.tick() => {
                cleanup_once(&pool).await;
            }
            () = shutdown.cancelled() => {
                tracing::info!("Cleanup worker shutting down");
                break;
            }
        }
    }
}
