//! Question search over titles and tag names.

use crate::db::PostSummary;

/// Questions page search.
///
/// A post matches when the query is blank or found (case-insensitively) in its
/// title or in one of its tags, and it carries every selected tag.
#[must_use]
pub fn search_questions(
    posts: &[PostSummary],
    query: &str,
    selected_tags: &[String],
) -> Vec<PostSummary> {
    let needle = query.trim().to_lowercase();

    posts
        .iter()
        .filter(|post| {
            needle.is_empty()
                || post.title.to_lowercase().contains(&needle)
                || post.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .filter(|post| selected_tags.iter().all(|tag| post.has_tag(tag)))
        .cloned()
        .collect()
}
