//! Forum logic that works on already-loaded posts.
//!
//! Everything here except [`monitor`] and [`posts`] is a pure function of its
//! inputs, so it can be tested without a database.

pub mod alerts;
pub mod feed;
pub mod filter;
pub mod monitor;
pub mod posts;
pub mod search;

pub use alerts::{derive_labels, find_unanswered, is_stale, AlertLabels, UnansweredPost};
pub use feed::{compose_feed, generate_preview, Feed};
pub use filter::{
    filter_posts, group_by_semester, reconcile_subject, semester_bucket, subjects_for,
    SemesterBucket, TagFilter,
};
pub use monitor::{AlertHandle, AlertMonitor, AlertSnapshot};
pub use posts::{delete_post_with_attachments, normalize_tags, DeletionReport};
pub use search::search_questions;

use crate::db::PostSummary;

/// Anything that carries a flat list of tag names.
pub trait Tagged {
    fn tags(&self) -> &[String];
}

impl Tagged for PostSummary {
    fn tags(&self) -> &[String] {
        &self.tags
    }
}
