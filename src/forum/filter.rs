//! Course / semester / subject filtering and semester grouping.

use serde::Serialize;

use super::Tagged;
use crate::vocab::{self, ALL_COURSES, ALL_SEMESTERS, ALL_SUBJECTS, MISCELLANEOUS, SEMESTERS};

/// The three independent tag constraints selected on the semester view.
///
/// `None` means the dimension is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub course: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
}

impl TagFilter {
    /// Build a filter from the raw selections. The "All ..." sentinels and
    /// blank values mean no constraint.
    #[must_use]
    pub fn from_selection(course: &str, semester: &str, subject: &str) -> Self {
        Self {
            course: constraint(course, ALL_COURSES),
            semester: constraint(semester, ALL_SEMESTERS),
            subject: constraint(subject, ALL_SUBJECTS),
        }
    }

    #[must_use]
    pub fn course_passes(&self, tags: &[String]) -> bool {
        passes(self.course.as_deref(), tags)
    }

    #[must_use]
    pub fn semester_passes(&self, tags: &[String]) -> bool {
        passes(self.semester.as_deref(), tags)
    }

    #[must_use]
    pub fn subject_passes(&self, tags: &[String]) -> bool {
        passes(self.subject.as_deref(), tags)
    }

    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        self.course_passes(tags) && self.semester_passes(tags) && self.subject_passes(tags)
    }

    /// Grouping by semester only makes sense when no semester is selected.
    #[must_use]
    pub const fn groups_by_semester(&self) -> bool {
        self.semester.is_none()
    }

    /// The selection as shown in forms and URLs, sentinels included.
    #[must_use]
    pub fn course_label(&self) -> &str {
        self.course.as_deref().unwrap_or(ALL_COURSES)
    }

    #[must_use]
    pub fn semester_label(&self) -> &str {
        self.semester.as_deref().unwrap_or(ALL_SEMESTERS)
    }

    #[must_use]
    pub fn subject_label(&self) -> &str {
        self.subject.as_deref().unwrap_or(ALL_SUBJECTS)
    }

    /// Query string reproducing this selection.
    #[must_use]
    pub fn to_query(&self) -> String {
        format!(
            "course={}&semester={}&subject={}",
            urlencoding::encode(self.course_label()),
            urlencoding::encode(self.semester_label()),
            urlencoding::encode(self.subject_label()),
        )
    }
}

fn constraint(raw: &str, sentinel: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == sentinel {
        None
    } else {
        Some(raw.to_string())
    }
}

fn passes(selected: Option<&str>, tags: &[String]) -> bool {
    selected.map_or(true, |value| tags.iter().any(|t| t == value))
}

/// Keep the posts that match the filter, preserving input order.
#[must_use]
pub fn filter_posts<T: Tagged + Clone>(posts: &[T], filter: &TagFilter) -> Vec<T> {
    posts
        .iter()
        .filter(|p| filter.matches(p.tags()))
        .cloned()
        .collect()
}

/// One semester section of the grouped view.
#[derive(Debug, Clone, Serialize)]
pub struct SemesterBucket<T> {
    pub semester: &'static str,
    pub posts: Vec<T>,
}

/// The bucket a tag list belongs to.
///
/// When several semester tags are present the earliest semester wins, so the
/// result does not depend on the order tags were stored in.
#[must_use]
pub fn semester_bucket(tags: &[String]) -> &'static str {
    SEMESTERS
        .iter()
        .find(|semester| tags.iter().any(|t| t == *semester))
        .copied()
        .unwrap_or(MISCELLANEOUS)
}

/// Partition posts into semester buckets.
///
/// Buckets follow semester order with "Miscellaneous" last; empty buckets are
/// omitted and posts keep their relative order inside a bucket.
#[must_use]
pub fn group_by_semester<T: Tagged>(posts: Vec<T>) -> Vec<SemesterBucket<T>> {
    let mut buckets: Vec<SemesterBucket<T>> = SEMESTERS
        .iter()
        .copied()
        .chain(std::iter::once(MISCELLANEOUS))
        .map(|semester| SemesterBucket {
            semester,
            posts: Vec::new(),
        })
        .collect();

    for post in posts {
        let label = semester_bucket(post.tags());
        if let Some(bucket) = buckets.iter_mut().find(|b| b.semester == label) {
            bucket.posts.push(post);
        }
    }

    buckets.retain(|b| !b.posts.is_empty());
    buckets
}

/// Subjects offered for a course and semester.
///
/// Built-in curriculum subjects come first, followed by admin-managed ones
/// not already listed. Empty when either selection is unconstrained.
#[must_use]
pub fn subjects_for(course: &str, semester: &str, managed: &[String]) -> Vec<String> {
    if constraint(course, ALL_COURSES).is_none() || constraint(semester, ALL_SEMESTERS).is_none() {
        return Vec::new();
    }

    let mut subjects: Vec<String> = vocab::curriculum_subjects(course, semester)
        .into_iter()
        .map(str::to_string)
        .collect();
    for name in managed {
        if !subjects.contains(name) {
            subjects.push(name.clone());
        }
    }
    subjects
}

/// Reset a subject selection that is no longer offered.
#[must_use]
pub fn reconcile_subject(selected: &str, available: &[String]) -> String {
    if selected == ALL_SUBJECTS || available.iter().any(|s| s == selected) {
        selected.to_string()
    } else {
        ALL_SUBJECTS.to_string()
    }
}
