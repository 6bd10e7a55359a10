use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::{is_unique_violation, required};
use crate::auth::RequireAdmin;
use crate::db::{self as queries, Course, Subject};
use crate::error::ApiError;
use crate::vocab;
use crate::web::AppState;

/// GET /api/admin/courses
pub async fn list_courses(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(queries::list_courses(state.db.pool()).await?))
}

#[derive(Debug, Deserialize)]
pub struct CourseBody {
    pub name: String,
}

pub(crate) async fn add_course(state: &AppState, name: &str) -> Result<Course, ApiError> {
    let name = required(name, "name")?;
    match queries::create_course(state.db.pool(), &name).await {
        Ok(course) => {
            tracing::info!(course_id = course.id, name = %course.name, "Created course");
            Ok(course)
        }
        Err(e) if is_unique_violation(&e) => {
            Err(ApiError::conflict(format!("Course '{name}' already exists")))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/admin/courses
pub async fn create_course(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CourseBody>,
) -> Result<impl IntoResponse, ApiError> {
    let course = add_course(&state, &body.name).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// DELETE /api/admin/courses/:id - Also removes the course's subjects.
pub async fn delete_course(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_course(state.db.pool(), id).await? {
        tracing::info!(course_id = id, "Deleted course");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Course not found"))
    }
}

#[derive(Debug, Deserialize)]
pub struct SubjectFilter {
    pub course_id: Option<i64>,
}

/// GET /api/admin/subjects?course_id=
pub async fn list_subjects(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<SubjectFilter>,
) -> Result<Json<Vec<Subject>>, ApiError> {
    Ok(Json(
        queries::list_subjects(state.db.pool(), filter.course_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SubjectBody {
    pub course_id: i64,
    pub semester: String,
    pub name: String,
}

pub(crate) async fn add_subject(state: &AppState, body: &SubjectBody) -> Result<Subject, ApiError> {
    let name = required(&body.name, "name")?;
    let semester = body.semester.trim();
    if !vocab::is_semester(semester) {
        return Err(ApiError::validation(format!("Unknown semester '{semester}'")));
    }

    let courses = queries::list_courses(state.db.pool()).await?;
    if !courses.iter().any(|c| c.id == body.course_id) {
        return Err(ApiError::not_found("Course not found"));
    }

    match queries::create_subject(state.db.pool(), body.course_id, semester, &name).await {
        Ok(subject) => {
            tracing::info!(subject_id = subject.id, name = %subject.name, "Created subject");
            Ok(subject)
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict(format!(
            "Subject '{name}' already exists for {semester}"
        ))),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/admin/subjects
pub async fn create_subject(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<SubjectBody>,
) -> Result<impl IntoResponse, ApiError> {
    let subject = add_subject(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// DELETE /api/admin/subjects/:id
pub async fn delete_subject(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if queries::delete_subject(state.db.pool(), id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Subject not found"))
    }
}
