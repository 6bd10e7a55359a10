use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;

use crate::auth::RequireUser;
use crate::db::{self as queries, Profile};
use crate::error::ApiError;
use crate::forum::AlertSnapshot;
use crate::web::AppState;

/// Teachers, admins and students on the moderation rota see alerts.
pub(crate) async fn can_view_alerts(state: &AppState, user: &Profile) -> Result<bool, ApiError> {
    if user.is_teacher() || user.is_admin() {
        return Ok(true);
    }
    Ok(queries::get_moderator_slot(state.db.pool(), user.id)
        .await?
        .is_some())
}

async fn ensure_can_view(state: &AppState, user: &Profile) -> Result<(), ApiError> {
    if can_view_alerts(state, user).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only teachers and moderators can view alerts"))
    }
}

/// GET /api/alerts/unanswered - The latest snapshot from the monitor.
pub async fn unanswered(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Arc<AlertSnapshot>>, ApiError> {
    ensure_can_view(&state, &user).await?;
    Ok(Json(state.alerts.current()))
}

/// GET /api/alerts/stream - One `alerts` event per published snapshot.
pub async fn stream(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    ensure_can_view(&state, &user).await?;

    let mut rx = state.alerts.subscribe();
    let user_id = user.id;
    let events = async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            match Event::default().event("alerts").json_data(&*snapshot) {
                Ok(event) => yield Ok(event),
                Err(e) => tracing::warn!(user_id, "Failed to encode alert snapshot: {e}"),
            }
            if rx.changed().await.is_err() {
                tracing::debug!(user_id, "Alert monitor stopped, closing stream");
                break;
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
