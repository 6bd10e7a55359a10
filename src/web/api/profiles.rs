use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{optional, required};
use crate::auth::{RequireStudent, RequireTeacher, RequireUser};
use crate::db::{self as queries, Profile, Role, StudentStats};
use crate::error::ApiError;
use crate::vocab;
use crate::web::AppState;

const MAX_NICKNAME_LEN: usize = 32;

/// The signed-in profile with its derived role flags.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub display_name: String,
    pub is_teacher: bool,
    pub is_moderator: bool,
    pub moderator_time_slot: Option<String>,
}

pub(crate) async fn me_response(state: &AppState, profile: Profile) -> Result<MeResponse, ApiError> {
    let moderator_time_slot = if profile.is_student() {
        queries::get_moderator_slot(state.db.pool(), profile.id).await?
    } else {
        None
    };

    Ok(MeResponse {
        display_name: profile.display_name().to_string(),
        is_teacher: profile.is_teacher(),
        is_moderator: moderator_time_slot.is_some(),
        moderator_time_slot,
        profile,
    })
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(me_response(&state, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct AcademicsBody {
    pub course: Option<String>,
    pub semester: Option<String>,
}

/// Store a profile's course and semester. Blank values clear them.
pub(crate) async fn change_academics(
    state: &AppState,
    user: &mut Profile,
    body: &AcademicsBody,
) -> Result<(), ApiError> {
    let course = optional(body.course.as_deref());
    let semester = optional(body.semester.as_deref());
    if let Some(semester) = &semester {
        if !vocab::is_semester(semester) {
            return Err(ApiError::validation(format!("Unknown semester '{semester}'")));
        }
    }

    queries::update_profile_academics(
        state.db.pool(),
        user.id,
        course.as_deref(),
        semester.as_deref(),
    )
    .await?;

    user.course = course;
    user.semester = semester;
    Ok(())
}

/// PUT /api/me/academics
pub async fn update_academics(
    State(state): State<AppState>,
    RequireUser(mut user): RequireUser,
    Json(body): Json<AcademicsBody>,
) -> Result<Json<MeResponse>, ApiError> {
    change_academics(&state, &mut user, &body).await?;
    Ok(Json(me_response(&state, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct NicknameBody {
    pub nickname: String,
}

/// Set the nickname. A profile can do this exactly once.
pub(crate) async fn change_nickname(
    state: &AppState,
    user: &mut Profile,
    raw: &str,
) -> Result<(), ApiError> {
    let nickname = required(raw, "nickname")?;
    if nickname.chars().count() > MAX_NICKNAME_LEN {
        return Err(ApiError::validation(format!(
            "nickname must be at most {MAX_NICKNAME_LEN} characters"
        )));
    }

    if !queries::set_nickname_once(state.db.pool(), user.id, &nickname).await? {
        return Err(ApiError::conflict("Nickname has already been changed once"));
    }

    user.nickname = Some(nickname);
    user.nickname_changed = true;
    Ok(())
}

/// PUT /api/me/nickname
pub async fn set_nickname(
    State(state): State<AppState>,
    RequireUser(mut user): RequireUser,
    Json(body): Json<NicknameBody>,
) -> Result<Json<MeResponse>, ApiError> {
    change_nickname(&state, &mut user, &body.nickname).await?;
    Ok(Json(me_response(&state, user).await?))
}

/// GET /api/me/stats - Students only.
pub async fn my_stats(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
) -> Result<Json<StudentStats>, ApiError> {
    Ok(Json(queries::get_student_stats(state.db.pool(), user.id).await?))
}

/// GET /api/students - Teachers pick moderators from this list.
pub async fn list_students(
    State(state): State<AppState>,
    RequireTeacher(_teacher): RequireTeacher,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(
        queries::list_profiles_by_role(state.db.pool(), Role::Student).await?,
    ))
}

/// GET /api/students/:id/stats
pub async fn student_stats(
    State(state): State<AppState>,
    RequireTeacher(_teacher): RequireTeacher,
    Path(id): Path<i64>,
) -> Result<Json<StudentStats>, ApiError> {
    let student = queries::get_profile_by_id(state.db.pool(), id)
        .await?
        .filter(Profile::is_student)
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    Ok(Json(
        queries::get_student_stats(state.db.pool(), student.id).await?,
    ))
}
