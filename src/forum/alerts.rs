//! Detection of stale posts nobody has answered.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::PostSummary;
use crate::vocab::{self, COURSES, MISCELLANEOUS, SEMESTERS};

/// Course / semester / subject read off a post's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLabels {
    pub course: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
}

/// A post that should get a moderator's attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnansweredPost {
    pub post_id: i64,
    pub title: String,
    pub author: String,
    pub created_at: String,
    pub course: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
}

/// Strictly older than the threshold. A post exactly at the threshold is not stale.
#[must_use]
pub fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now - created_at > threshold
}

/// Derive display labels from a tag list.
///
/// Course and semester follow the canonical vocabulary order. The subject is
/// the lexicographically first tag outside the course, semester and general
/// vocabularies, so a general category is never reported as a subject.
#[must_use]
pub fn derive_labels(tags: &[String]) -> AlertLabels {
    let has = |name: &str| tags.iter().any(|t| t == name);

    let course = COURSES.iter().find(|c| has(c)).map(|c| (*c).to_string());
    let semester = SEMESTERS
        .iter()
        .find(|s| has(s))
        .map(|s| (*s).to_string())
        .or_else(|| has(MISCELLANEOUS).then(|| MISCELLANEOUS.to_string()));
    let subject = tags
        .iter()
        .filter(|t| vocab::is_subject_candidate(t))
        .min()
        .cloned();

    AlertLabels {
        course,
        semester,
        subject,
    }
}

/// Stale posts with no comments, oldest first (ties broken by id).
///
/// Posts whose timestamp cannot be parsed are skipped.
#[must_use]
pub fn find_unanswered(
    candidates: &[PostSummary],
    now: DateTime<Utc>,
    threshold: Duration,
) -> Vec<UnansweredPost> {
    let mut stale: Vec<(DateTime<Utc>, &PostSummary)> = candidates
        .iter()
        .filter(|p| p.comment_count == 0)
        .filter_map(|p| p.created_at_utc().map(|at| (at, p)))
        .filter(|(at, _)| is_stale(*at, now, threshold))
        .collect();
    stale.sort_by_key(|(at, p)| (*at, p.id));

    stale
        .into_iter()
        .map(|(_, p)| {
            let labels = derive_labels(&p.tags);
            UnansweredPost {
                post_id: p.id,
                title: p.title.clone(),
                author: p.author.clone(),
                created_at: p.created_at.clone(),
                course: labels.course,
                semester: labels.semester,
                subject: labels.subject,
            }
        })
        .collect()
}

/// The next moment an unanswered, not yet stale post becomes stale.
#[must_use]
pub fn next_crossing(
    candidates: &[PostSummary],
    now: DateTime<Utc>,
    threshold: Duration,
) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .filter(|p| p.comment_count == 0)
        .filter_map(PostSummary::created_at_utc)
        .filter(|at| !is_stale(*at, now, threshold))
        // Timestamps have second precision, so one second past the threshold
        // is the first instant the strict comparison holds.
        .map(|at| at + threshold + Duration::seconds(1))
        .min()
}
