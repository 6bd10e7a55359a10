use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use maud::{html, Markup};
use serde::Deserialize;

use super::{render, PageResult};
use crate::auth::{
    clear_session_cookie, home_path, issue_magic_link, session_token_from_headers, MaybeUser,
};
use crate::db::{self as queries, Profile};
use crate::vocab::{COURSES, SEMESTERS};
use crate::web::api::auth::{parse_request, MagicLinkBody};
use crate::web::AppState;

/// GET /
pub async fn landing(MaybeUser(user): MaybeUser) -> PageResult {
    let home = user.as_ref().and_then(Profile::role_enum).map(home_path);

    Ok(render(
        "Welcome",
        user.as_ref(),
        html! {
            h1 { "Campus Dialogue Hub" }
            p { "Ask questions, share resources and discuss coursework with your classmates and teachers." }
            @if let Some(home) = home {
                p { a href=(home) { "Continue to your dashboard" } }
            } @else {
                p { a href="/login" { "Sign in with your college email" } }
            }
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    error: Option<String>,
}

fn login_error_message(code: &str) -> &'static str {
    match code {
        "expired" => "That sign-in link is invalid, expired or already used. Request a new one.",
        _ => "Sign-in failed. Please try again.",
    }
}

/// GET /login
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Some(home) = user.as_ref().and_then(Profile::role_enum).map(home_path) {
        return Redirect::to(home).into_response();
    }

    let error = query.error.as_deref().map(login_error_message);
    render("Login", None, render_login_form(error)).into_response()
}

fn render_login_form(error: Option<&str>) -> Markup {
    html! {
        h1 { "Sign in" }
        @if let Some(error) = error {
            div class="alert" { (error) }
        }
        form method="post" action="/login" class="card" {
            p {
                label for="email" { "College email" } br;
                input type="email" id="email" name="email" required;
            }
            p {
                "I am a "
                label { input type="radio" name="role" value="student" checked; " student" }
                " "
                label { input type="radio" name="role" value="teacher"; " teacher" }
            }
            p {
                label for="course" { "Course" } br;
                select id="course" name="course" {
                    option value="" { "Not set" }
                    @for course in COURSES {
                        option value=(course) { (course) }
                    }
                }
            }
            p {
                label for="semester" { "Semester" } br;
                select id="semester" name="semester" {
                    option value="" { "Not set" }
                    @for semester in SEMESTERS {
                        option value=(semester) { (semester) }
                    }
                }
            }
            button type="submit" { "Email me a sign-in link" }
        }
    }
}

/// POST /login - Send the magic link and show where it went.
pub async fn login_submit(
    State(state): State<AppState>,
    Form(body): Form<MagicLinkBody>,
) -> PageResult {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => return Ok(render("Login", None, render_login_form(Some(&e.to_string())))),
    };

    issue_magic_link(
        state.db.pool(),
        &state.config,
        state.mailer.as_ref(),
        &request,
    )
    .await?;

    Ok(render(
        "Check your email",
        None,
        html! {
            h1 { "Check your email" }
            div class="notice" {
                "We sent a sign-in link to " strong { (request.email) } ". It can be used once."
            }
        },
    ))
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> PageResult<Response> {
    if let Some(token) = session_token_from_headers(&headers) {
        queries::delete_session(state.db.pool(), &token).await?;
    }

    let cookie = clear_session_cookie(state.config.cookie_secure);
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/login")).into_response())
}
