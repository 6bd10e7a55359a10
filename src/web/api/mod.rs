//! JSON API mounted under `/api`.

pub(super) mod admin;
pub(super) mod alerts;
pub(super) mod auth;
pub(super) mod comments;
pub(super) mod moderation;
pub(super) mod posts;
pub(super) mod profiles;
pub(super) mod tags;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

use super::AppState;
use crate::error::ApiError;

/// Multipart framing overhead allowed on top of the per-file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;
/// Files accepted per attachment upload request.
pub(super) const MAX_FILES_PER_UPLOAD: usize = 5;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    let upload_limit = max_upload_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Auth
        .route("/auth/magic-link", post(auth::request_magic_link))
        .route("/auth/logout", post(auth::logout))
        // Profiles
        .route("/me", get(profiles::me))
        .route("/me/academics", put(profiles::update_academics))
        .route("/me/nickname", put(profiles::set_nickname))
        .route("/me/stats", get(profiles::my_stats))
        .route("/students", get(profiles::list_students))
        .route("/students/:id/stats", get(profiles::student_stats))
        // Posts
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/feed", get(posts::feed))
        .route("/posts/semester-view", get(posts::semester_view))
        .route(
            "/posts/:id",
            get(posts::detail).put(posts::update).delete(posts::remove),
        )
        .route("/posts/:id/vote", post(posts::vote))
        .route(
            "/posts/:id/attachments",
            post(posts::upload_attachments).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/posts/:id/comments",
            get(comments::list).post(comments::create),
        )
        // Tags and subjects
        .route("/tags", get(tags::list).post(tags::create))
        .route("/subjects", get(tags::subjects))
        // Moderation
        .route("/time-slots", get(moderation::time_slots))
        .route(
            "/moderators",
            get(moderation::list).post(moderation::assign),
        )
        .route("/moderators/:slot", delete(moderation::unassign))
        .route("/alerts/unanswered", get(alerts::unanswered))
        .route("/alerts/stream", get(alerts::stream))
        // Admin
        .route(
            "/admin/courses",
            get(admin::list_courses).post(admin::create_course),
        )
        .route("/admin/courses/:id", delete(admin::delete_course))
        .route(
            "/admin/subjects",
            get(admin::list_subjects).post(admin::create_subject),
        )
        .route("/admin/subjects/:id", delete(admin::delete_subject))
}

/// Trimmed value, or a validation error naming the field when blank.
pub(super) fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::validation(format!("{field} must not be empty")))
    } else {
        Ok(value.to_string())
    }
}

/// Trimmed value, with blanks mapped to `None`.
pub(super) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whether an error chain bottoms out in a UNIQUE constraint violation.
pub(super) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(sqlx::Error::as_database_error)
            .is_some_and(|db| db.is_unique_violation())
    })
}
