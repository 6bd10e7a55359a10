//! Server-rendered pages.
//!
//! Pages share the JSON API's handlers for their writes and answer with a
//! redirect, so reloading a page never repeats a form submission.

mod auth;
mod dashboards;
mod forum;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use maud::{html, Markup};

use super::layout::BaseLayout;
use super::{api, AppState};
use crate::auth::MaybeUser;
use crate::db::{Profile, Role};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::landing))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/auth/callback", get(api::auth::callback))
        .route("/logout", post(auth::logout))
        // Forum
        .route("/home", get(forum::home))
        .route("/questions", get(forum::questions).post(forum::ask))
        .route("/post/:id", get(forum::post_detail))
        .route("/post/:id/vote", post(forum::vote))
        .route("/post/:id/comments", post(forum::comment))
        .route("/post/:id/delete", post(forum::delete))
        .route(
            "/edit-post/:id",
            get(forum::edit_page).post(forum::edit_submit),
        )
        .route("/semester-view", get(forum::semester_view))
        // Dashboards
        .route("/teacher", get(dashboards::teacher))
        .route("/teacher/moderators", post(dashboards::assign_moderator))
        .route(
            "/teacher/moderators/:slot/remove",
            post(dashboards::remove_moderator),
        )
        .route("/student", get(dashboards::student))
        .route("/student/academics", post(dashboards::set_academics))
        .route("/student/nickname", post(dashboards::set_nickname))
        .route("/admin", get(dashboards::admin))
        .route("/admin/courses", post(dashboards::add_course))
        .route("/admin/courses/:id/delete", post(dashboards::delete_course))
        .route("/admin/subjects", post(dashboards::add_subject))
        .route("/admin/subjects/:id/delete", post(dashboards::delete_subject))
        // Not built yet
        .route("/chat", get(chat))
        .route("/groups", get(groups))
        .route("/events", get(events))
}

/// Why a page could not be rendered.
#[derive(Debug)]
pub enum PageError {
    Redirect(&'static str),
    Api(ApiError),
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Api(ApiError::Internal(err))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(to) => Redirect::to(to).into_response(),
            Self::Api(err) => {
                let status = err.status();
                if let ApiError::Internal(e) = &err {
                    tracing::error!("Page failed: {e:#}");
                }
                (status, Html(render_error_page(status, &err.to_string()).into_string()))
                    .into_response()
            }
        }
    }
}

pub type PageResult<T = Html<String>> = Result<T, PageError>;

/// The signed-in profile, or a redirect to the login page.
pub(super) fn signed_in(user: Option<Profile>) -> Result<Profile, PageError> {
    user.ok_or(PageError::Redirect("/login"))
}

/// A signed-in profile with `role`. Other roles go back to the landing page.
pub(super) fn with_role(user: Option<Profile>, role: Role) -> Result<Profile, PageError> {
    let user = signed_in(user)?;
    if user.role_enum() == Some(role) {
        Ok(user)
    } else {
        Err(PageError::Redirect("/"))
    }
}

pub(super) fn render(title: &str, user: Option<&Profile>, content: Markup) -> Html<String> {
    Html(BaseLayout::new(title, user).render(content).into_string())
}

fn render_error_page(status: StatusCode, message: &str) -> Markup {
    BaseLayout::new("Error", None).render(html! {
        h1 { (status.as_u16()) " " (status.canonical_reason().unwrap_or("Error")) }
        p { (message) }
        p { a href="/" { "Back to start" } }
    })
}

fn coming_soon(title: &str, user: &Profile) -> Html<String> {
    render(
        title,
        Some(user),
        html! {
            h1 { (title) }
            div class="notice" { (title) " is coming soon." }
        },
    )
}

async fn chat(MaybeUser(user): MaybeUser) -> PageResult {
    Ok(coming_soon("Chat", &signed_in(user)?))
}

async fn groups(MaybeUser(user): MaybeUser) -> PageResult {
    Ok(coming_soon("Groups", &signed_in(user)?))
}

async fn events(MaybeUser(user): MaybeUser) -> PageResult {
    Ok(coming_soon("Events", &signed_in(user)?))
}
