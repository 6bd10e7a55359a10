use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::auth::{RequireTeacher, RequireUser};
use crate::db::{self as queries, AssignmentDisplay, TimeSlot};
use crate::error::ApiError;
use crate::web::AppState;

/// GET /api/time-slots
pub async fn time_slots() -> Json<Vec<&'static str>> {
    Json(TimeSlot::ALL.iter().map(TimeSlot::as_str).collect())
}

/// GET /api/moderators
pub async fn list(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
) -> Result<Json<Vec<AssignmentDisplay>>, ApiError> {
    Ok(Json(queries::list_assignments(state.db.pool()).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub student_id: i64,
    pub time_slot: String,
}

pub(crate) fn parse_slot(raw: &str) -> Result<TimeSlot, ApiError> {
    TimeSlot::from_str(raw.trim())
        .ok_or_else(|| ApiError::validation(format!("Unknown time slot '{raw}'")))
}

/// Assign a student to a slot on behalf of a teacher.
pub(crate) async fn assign_student(
    state: &AppState,
    teacher_id: i64,
    student_id: i64,
    raw_slot: &str,
) -> Result<AssignmentDisplay, ApiError> {
    let slot = parse_slot(raw_slot)?;
    let student = queries::get_profile_by_id(state.db.pool(), student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    if !student.is_student() {
        return Err(ApiError::validation("Only students can be moderators"));
    }

    let assignment = queries::assign_moderator(state.db.pool(), student.id, slot, teacher_id).await?;
    tracing::info!(
        student_id = student.id,
        time_slot = slot.as_str(),
        assigned_by = teacher_id,
        "Assigned moderator"
    );

    Ok(AssignmentDisplay {
        id: assignment.id,
        student_id: assignment.student_id,
        student_username: student.username,
        time_slot: assignment.time_slot,
        assigned_by: assignment.assigned_by,
        created_at: assignment.created_at,
    })
}

/// POST /api/moderators - Replaces the current holder of the slot.
pub async fn assign(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
    Json(body): Json<AssignBody>,
) -> Result<impl IntoResponse, ApiError> {
    let assignment = assign_student(&state, teacher.id, body.student_id, &body.time_slot).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// DELETE /api/moderators/:slot
pub async fn unassign(
    State(state): State<AppState>,
    RequireTeacher(_teacher): RequireTeacher,
    Path(slot): Path<String>,
) -> Result<StatusCode, ApiError> {
    let slot = parse_slot(&slot)?;
    if queries::unassign_slot(state.db.pool(), slot).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("No moderator assigned to that slot"))
    }
}
