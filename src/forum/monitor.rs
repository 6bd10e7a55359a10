//! Background task that keeps the unanswered-post list current.
//!
//! The monitor re-evaluates on a fixed interval, at the moment the next post
//! crosses the staleness threshold, and whenever new activity is reported
//! through [`AlertHandle::notify_activity`]. Each evaluation is published on a
//! `watch` channel that request handlers read from.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::alerts::{find_unanswered, next_crossing, UnansweredPost};
use crate::db::{self, format_timestamp};

/// One evaluation of the unanswered-post detector.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertSnapshot {
    /// `None` until the first evaluation has run.
    pub evaluated_at: Option<String>,
    pub posts: Vec<UnansweredPost>,
}

/// Cheap, cloneable access to the monitor's output.
#[derive(Debug, Clone)]
pub struct AlertHandle {
    rx: watch::Receiver<Arc<AlertSnapshot>>,
    activity: Arc<Notify>,
}

impl AlertHandle {
    /// The most recent snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<AlertSnapshot> {
        self.rx.borrow().clone()
    }

    /// A receiver that resolves whenever a new snapshot is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertSnapshot>> {
        self.rx.clone()
    }

    /// Report a new, edited or deleted post or a new comment so the monitor
    /// re-evaluates right away.
    pub fn notify_activity(&self) {
        self.activity.notify_one();
    }
}

pub struct AlertMonitor {
    pool: SqlitePool,
    poll_interval: Duration,
    threshold: chrono::Duration,
    tx: watch::Sender<Arc<AlertSnapshot>>,
    activity: Arc<Notify>,
}

impl AlertMonitor {
    /// Create a monitor and the handle used to read its snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if `stale_after` does not fit a signed duration.
    pub fn new(
        pool: SqlitePool,
        poll_interval: Duration,
        stale_after: Duration,
    ) -> Result<(Self, AlertHandle)> {
        let threshold =
            chrono::Duration::from_std(stale_after).context("Stale threshold out of range")?;
        let (tx, rx) = watch::channel(Arc::new(AlertSnapshot::default()));
        let activity = Arc::new(Notify::new());

        let handle = AlertHandle {
            rx,
            activity: Arc::clone(&activity),
        };
        let monitor = Self {
            pool,
            poll_interval,
            threshold,
            tx,
            activity,
        };
        Ok((monitor, handle))
    }

    /// Evaluate once and publish the result.
    ///
    /// Returns when the next not-yet-stale post will cross the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the posts cannot be loaded.
    pub async fn refresh(&self) -> Result<Option<DateTime<Utc>>> {
        self.refresh_at(Utc::now()).await
    }

    async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let candidates = db::list_uncommented_posts(&self.pool).await?;
        let posts = find_unanswered(&candidates, now, self.threshold);
        let next = next_crossing(&candidates, now, self.threshold);

        debug!(unanswered = posts.len(), next_crossing = ?next, "Evaluated unanswered posts");

        self.tx.send_replace(Arc::new(AlertSnapshot {
            evaluated_at: Some(format_timestamp(now)),
            posts,
        }));
        Ok(next)
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            threshold_secs = self.threshold.num_seconds(),
            "Starting alert monitor"
        );

        loop {
            let next = match self.refresh().await {
                Ok(next) => next,
                Err(e) => {
                    error!("Failed to evaluate unanswered posts: {e:#}");
                    None
                }
            };
            let wait = self.wait_duration(next, Utc::now());

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.activity.notified() => {
                    debug!("Alert monitor woken by new activity");
                }
                () = shutdown.cancelled() => {
                    info!("Alert monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Sleep until the poll interval elapses or the next post crosses the
    /// threshold, whichever comes first.
    fn wait_duration(&self, next: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
        next.map_or(self.poll_interval, |at| {
            (at - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.poll_interval)
        })
    }
}
