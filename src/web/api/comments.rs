use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::posts::load_summary;
use super::required;
use crate::auth::RequireUser;
use crate::db::{self as queries, CommentDisplay, Profile};
use crate::error::ApiError;
use crate::web::AppState;

const MAX_COMMENT_LEN: usize = 5000;

/// GET /api/posts/:id/comments
pub async fn list(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentDisplay>>, ApiError> {
    load_summary(&state, post_id).await?;
    Ok(Json(
        queries::list_comments_for_post(state.db.pool(), post_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

/// Validate and store a comment, returning its id.
pub(crate) async fn add_comment(
    state: &AppState,
    user: &Profile,
    post_id: i64,
    raw: &str,
) -> Result<i64, ApiError> {
    let content = required(raw, "content")?;
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::validation(format!(
            "comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    load_summary(state, post_id).await?;

    let id = queries::create_comment(state.db.pool(), post_id, user.id, &content).await?;
    tracing::debug!(post_id, comment_id = id, "Created comment");

    // A first comment can take a post off the unanswered list.
    state.alerts.notify_activity();
    Ok(id)
}

/// POST /api/posts/:id/comments
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = add_comment(&state, &user, post_id, &body.content).await?;

    let comment = queries::list_comments_for_post(state.db.pool(), post_id)
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| anyhow::anyhow!("comment {id} vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(comment)))
}
