use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::SqlitePool;

use super::session::session_token_from_headers;
use crate::db::{self as queries, now_timestamp, Profile};
use crate::error::ApiError;

/// Current authenticated profile (if any).
/// Use this extractor when authentication is optional.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Profile>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);

        let Some(token) = session_token_from_headers(&parts.headers) else {
            return Ok(MaybeUser(None));
        };

        let Some(session) = queries::get_session_by_token(&pool, &token).await? else {
            return Ok(MaybeUser(None));
        };

        // Timestamps share one format, so string order is time order.
        if session.expires_at < now_timestamp() {
            if let Err(e) = queries::delete_session(&pool, &token).await {
                tracing::warn!("Failed to delete expired session: {e:#}");
            }
            return Ok(MaybeUser(None));
        }

        let Some(profile) = queries::get_profile_by_id(&pool, session.user_id).await? else {
            return Ok(MaybeUser(None));
        };

        if let Err(e) = queries::update_session_last_used(&pool, session.id).await {
            tracing::warn!("Failed to update session: {e:#}");
        }

        Ok(MaybeUser(Some(profile)))
    }
}

/// Current authenticated profile (required).
/// Rejects with 401 `authentication_required` when not signed in.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Profile);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(RequireUser).ok_or(ApiError::AuthenticationRequired)
    }
}

/// Require a teacher. Returns 403 for other roles.
#[derive(Debug, Clone)]
pub struct RequireTeacher(pub Profile);

#[async_trait]
impl<S> FromRequestParts<S> for RequireTeacher
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !user.is_teacher() {
            return Err(ApiError::forbidden("Teacher access required"));
        }

        Ok(RequireTeacher(user))
    }
}

/// Require a student. Returns 403 for other roles.
#[derive(Debug, Clone)]
pub struct RequireStudent(pub Profile);

#[async_trait]
impl<S> FromRequestParts<S> for RequireStudent
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !user.is_student() {
            return Err(ApiError::forbidden("Student access required"));
        }

        Ok(RequireStudent(user))
    }
}

/// Require an admin. Returns 403 for other roles.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Profile);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }

        Ok(RequireAdmin(user))
    }
}
