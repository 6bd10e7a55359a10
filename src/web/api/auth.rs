use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::optional;
use crate::auth::{
    clear_session_cookie, home_path, issue_magic_link, normalize_email, redeem_magic_link,
    session_cookie, session_token_from_headers, MagicLinkRequest,
};
use crate::db::{self as queries, Role};
use crate::error::ApiError;
use crate::vocab;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct MagicLinkBody {
    pub email: String,
    pub role: String,
    pub course: Option<String>,
    pub semester: Option<String>,
}

/// Validate a login form into a sign-in request.
pub(crate) fn parse_request(body: &MagicLinkBody) -> Result<MagicLinkRequest, ApiError> {
    let email = normalize_email(&body.email)
        .ok_or_else(|| ApiError::validation("A valid email address is required"))?;

    let role = match body.role.trim().to_lowercase().as_str() {
        "student" => Role::Student,
        "teacher" => Role::Teacher,
        _ => return Err(ApiError::validation("Role must be 'student' or 'teacher'")),
    };

    let course = optional(body.course.as_deref());
    let semester = optional(body.semester.as_deref());
    if let Some(semester) = &semester {
        if !vocab::is_semester(semester) {
            return Err(ApiError::validation(format!("Unknown semester '{semester}'")));
        }
    }

    Ok(MagicLinkRequest {
        email,
        role,
        course,
        semester,
    })
}

/// POST /api/auth/magic-link - Email a one-time sign-in link.
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(body): Json<MagicLinkBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = parse_request(&body)?;
    issue_magic_link(
        state.db.pool(),
        &state.config,
        state.mailer.as_ref(),
        &request,
    )
    .await?;

    Ok(Json(json!({ "sent": true, "email": request.email })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    token: Option<String>,
}

/// GET /auth/callback - Redeem a magic link and start a session.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return Redirect::to("/login").into_response();
    };

    let sign_in = match redeem_magic_link(state.db.pool(), &state.config, &token).await {
        Ok(Some(sign_in)) => sign_in,
        Ok(None) => {
            tracing::info!("Rejected invalid or used magic link");
            return Redirect::to("/login?error=expired").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to redeem magic link: {e:#}");
            return Redirect::to("/login?error=failed").into_response();
        }
    };

    let target = sign_in.profile.role_enum().map_or("/", home_path);
    let cookie = session_cookie(
        &sign_in.session_token,
        state.config.session_ttl.as_secs(),
        state.config.cookie_secure,
    );

    tracing::info!(
        user_id = sign_in.profile.id,
        new_profile = sign_in.created,
        "User signed in"
    );

    ([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response()
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token_from_headers(&headers) {
        if let Err(e) = queries::delete_session(state.db.pool(), &token).await {
            return ApiError::from(e).into_response();
        }
    }

    let cookie = clear_session_cookie(state.config.cookie_secure);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "signed_out": true })),
    )
        .into_response()
}
