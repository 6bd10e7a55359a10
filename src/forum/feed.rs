//! Home feed: trending and latest posts, plus preview text.

use serde::Serialize;

use crate::db::PostSummary;

/// Number of words kept in a post preview.
pub const PREVIEW_WORDS: usize = 50;

/// The home feed: a few most-voted posts, then everything else by recency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Feed {
    pub trending: Vec<PostSummary>,
    pub latest: Vec<PostSummary>,
}

/// First [`PREVIEW_WORDS`] words of the content, with "..." appended when
/// anything was cut.
#[must_use]
pub fn generate_preview(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() > PREVIEW_WORDS {
        format!("{}...", words[..PREVIEW_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}

/// Split posts into trending and latest.
///
/// Trending holds the `trending_count` posts with the most votes (ties go to
/// the newer post). Latest holds the rest, newest first, so no post appears
/// twice.
#[must_use]
pub fn compose_feed(mut posts: Vec<PostSummary>, trending_count: usize) -> Feed {
    posts.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });

    let split = trending_count.min(posts.len());
    let mut latest = posts.split_off(split);
    latest.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    Feed {
        trending: posts,
        latest,
    }
}
