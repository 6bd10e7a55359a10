use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::required;
use crate::auth::RequireUser;
use crate::db::{self as queries, Tag};
use crate::error::ApiError;
use crate::forum::subjects_for;
use crate::web::AppState;

/// Suggestions returned while a tag is being typed.
const TAG_SEARCH_LIMIT: i64 = 20;
const MAX_TAG_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub q: Option<String>,
}

/// GET /api/tags?q=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => queries::search_tags(state.db.pool(), q, TAG_SEARCH_LIMIT).await?,
        None => queries::list_tags(state.db.pool()).await?,
    };
    Ok(Json(tags))
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub name: String,
}

/// POST /api/tags - Returns the existing tag when the name is taken.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    Json(body): Json<TagBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required(&body.name, "name")?;
    if name.chars().count() > MAX_TAG_LEN {
        return Err(ApiError::validation(format!(
            "tag must be at most {MAX_TAG_LEN} characters"
        )));
    }
    let tag = queries::get_or_create_tag(state.db.pool(), &name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    pub course: String,
    pub semester: String,
}

/// GET /api/subjects?course=&semester=
pub async fn subjects(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let managed =
        queries::subject_names_for(state.db.pool(), query.course.trim(), query.semester.trim())
            .await?;
    Ok(Json(subjects_for(
        query.course.trim(),
        query.semester.trim(),
        &managed,
    )))
}
