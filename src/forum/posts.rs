//! Post lifecycle steps that span the database and object storage.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::storage::ObjectStore;

/// Outcome of deleting a post.
///
/// Database rows are removed atomically before any object is touched, so a
/// storage failure can only leave orphaned files, never orphaned rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeletionReport {
    pub post_id: i64,
    pub attachments_deleted: usize,
    /// Keys that could not be removed, with the reason.
    pub failed_attachments: Vec<FailedObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedObject {
    pub key: String,
    pub error: String,
}

impl DeletionReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_attachments.is_empty()
    }
}

/// Delete a post, its comments, tag links, votes and stored attachments.
///
/// Returns `None` if the post does not exist.
///
/// # Errors
///
/// Returns an error if the database transaction fails. Storage failures are
/// reported in the [`DeletionReport`] instead.
pub async fn delete_post_with_attachments(
    pool: &SqlitePool,
    store: &dyn ObjectStore,
    post_id: i64,
) -> Result<Option<DeletionReport>> {
    let Some(attachments) = db::delete_post_rows(pool, post_id).await? else {
        return Ok(None);
    };

    let mut report = DeletionReport {
        post_id,
        ..DeletionReport::default()
    };

    for attachment in attachments {
        match store.delete(&attachment.key).await {
            Ok(()) => report.attachments_deleted += 1,
            Err(e) => {
                warn!(post_id, key = %attachment.key, "Failed to delete attachment: {e}");
                report.failed_attachments.push(FailedObject {
                    key: attachment.key,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        post_id,
        attachments_deleted = report.attachments_deleted,
        attachments_failed = report.failed_attachments.len(),
        "Deleted post"
    );
    Ok(Some(report))
}

/// Trim tag names, drop blanks and duplicates, keep first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
