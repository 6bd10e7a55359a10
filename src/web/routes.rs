use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use super::{api, pages, AppState};

/// Create the router with all routes.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(pages::router())
        .nest("/api", api::router(max_upload_bytes))
        .route("/healthz", get(health))
}

async fn health() -> impl IntoResponse {
    "OK"
}
