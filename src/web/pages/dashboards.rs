//! Role dashboards: teacher, student and admin.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use maud::{html, Markup};
use serde::Deserialize;

use super::{render, with_role, PageResult};
use crate::auth::MaybeUser;
use crate::db::{self as queries, Role, TimeSlot};
use crate::error::ApiError;
use crate::forum::AlertSnapshot;
use crate::vocab::{COURSES, SEMESTERS};
use crate::web::api::admin::{add_course as create_course, add_subject as create_subject, SubjectBody};
use crate::web::api::moderation::{assign_student, parse_slot};
use crate::web::api::profiles::{change_academics, change_nickname, AcademicsBody};
use crate::web::AppState;

/// Unanswered-post banner. Renders nothing when there is nothing to show.
fn render_alerts(snapshot: &AlertSnapshot) -> Markup {
    html! {
        @if !snapshot.posts.is_empty() {
            div class="alert" {
                strong { (snapshot.posts.len()) " unanswered posts need attention" }
                ul {
                    @for post in &snapshot.posts {
                        li {
                            a href={ "/post/" (post.post_id) } { (post.title) }
                            " by " (post.author) " · " (post.created_at)
                            @for label in [&post.course, &post.semester, &post.subject].into_iter().flatten() {
                                " " span class="tag" { (label) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// GET /teacher
pub async fn teacher(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult {
    let teacher = with_role(user, Role::Teacher)?;
    let snapshot = state.alerts.current();
    let assignments = queries::list_assignments(state.db.pool()).await?;
    let students = queries::list_profiles_by_role(state.db.pool(), Role::Student).await?;

    let mut student_rows = Vec::with_capacity(students.len());
    for student in &students {
        let stats = queries::get_student_stats(state.db.pool(), student.id).await?;
        student_rows.push((student, stats));
    }

    Ok(render(
        "Teacher Dashboard",
        Some(&teacher),
        html! {
            h1 { "Teacher Dashboard" }
            (render_alerts(&snapshot))
            section {
                h2 { "Moderation rota" }
                table {
                    thead { tr { th { "Time slot" } th { "Moderator" } th {} } }
                    tbody {
                        @for slot in TimeSlot::ALL {
                            tr {
                                td { (slot.as_str()) }
                                @match assignments.iter().find(|a| a.time_slot == slot.as_str()) {
                                    Some(assignment) => {
                                        td { (assignment.student_username) }
                                        td {
                                            form class="inline" method="post" action={ "/teacher/moderators/" (slot.as_str()) "/remove" } {
                                                button type="submit" { "Remove" }
                                            }
                                        }
                                    },
                                    None => {
                                        td class="meta" { "Unassigned" }
                                        td {}
                                    },
                                }
                            }
                        }
                    }
                }
                form method="post" action="/teacher/moderators" class="card" {
                    select name="student_id" required {
                        @for student in &students {
                            option value=(student.id) { (student.display_name()) " (" (student.email) ")" }
                        }
                    }
                    " "
                    select name="time_slot" {
                        @for slot in TimeSlot::ALL {
                            option value=(slot.as_str()) { (slot.as_str()) }
                        }
                    }
                    " "
                    button type="submit" disabled[students.is_empty()] { "Assign" }
                }
            }
            section {
                h2 { "Students" }
                table {
                    thead { tr { th { "Student" } th { "Course" } th { "Semester" } th { "Posts" } th { "Comments" } } }
                    tbody {
                        @for (student, stats) in &student_rows {
                            tr {
                                td { (student.display_name()) }
                                td { (student.course.as_deref().unwrap_or("-")) }
                                td { (student.semester.as_deref().unwrap_or("-")) }
                                td { (stats.post_count) }
                                td { (stats.comment_count) }
                            }
                        }
                    }
                }
            }
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct AssignForm {
    student_id: i64,
    time_slot: String,
}

/// POST /teacher/moderators
pub async fn assign_moderator(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<AssignForm>,
) -> PageResult<Response> {
    let teacher = with_role(user, Role::Teacher)?;
    assign_student(&state, teacher.id, form.student_id, &form.time_slot).await?;
    Ok(Redirect::to("/teacher").into_response())
}

/// POST /teacher/moderators/:slot/remove
pub async fn remove_moderator(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slot): Path<String>,
) -> PageResult<Response> {
    with_role(user, Role::Teacher)?;
    let slot = parse_slot(&slot)?;
    queries::unassign_slot(state.db.pool(), slot).await?;
    Ok(Redirect::to("/teacher").into_response())
}

/// GET /student
pub async fn student(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult {
    let student = with_role(user, Role::Student)?;
    let stats = queries::get_student_stats(state.db.pool(), student.id).await?;
    let slot = queries::get_moderator_slot(state.db.pool(), student.id).await?;
    let snapshot = state.alerts.current();

    Ok(render(
        "My Page",
        Some(&student),
        html! {
            h1 { (student.display_name()) }
            @if let Some(slot) = &slot {
                div class="notice" { "You moderate the " strong { (slot) } " slot." }
                (render_alerts(&snapshot))
            }
            div class="card" {
                p { "Posts: " strong { (stats.post_count) } " · Comments: " strong { (stats.comment_count) } }
                p class="meta" { (student.email) " · @" (student.username) }
            }
            section {
                h2 { "Academics" }
                form method="post" action="/student/academics" class="card" {
                    select name="course" {
                        option value="" { "Not set" }
                        @for course in COURSES {
                            option value=(course) selected[student.course.as_deref() == Some(course)] { (course) }
                        }
                    }
                    " "
                    select name="semester" {
                        option value="" { "Not set" }
                        @for semester in SEMESTERS {
                            option value=(semester) selected[student.semester.as_deref() == Some(semester)] { (semester) }
                        }
                    }
                    " "
                    button type="submit" { "Save" }
                }
            }
            section {
                h2 { "Nickname" }
                @if student.nickname_changed {
                    p class="meta" { "Your nickname has been set and can no longer be changed." }
                } @else {
                    form method="post" action="/student/nickname" class="card" {
                        input type="text" name="nickname" maxlength="32" required placeholder="Pick a nickname";
                        " "
                        button type="submit" { "Set nickname" }
                        p class="meta" { "You can only do this once." }
                    }
                }
            }
        },
    ))
}

/// POST /student/academics
pub async fn set_academics(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<AcademicsBody>,
) -> PageResult<Response> {
    let mut student = with_role(user, Role::Student)?;
    change_academics(&state, &mut student, &form).await?;
    Ok(Redirect::to("/student").into_response())
}

#[derive(Debug, Deserialize)]
pub struct NicknameForm {
    nickname: String,
}

/// POST /student/nickname
pub async fn set_nickname(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<NicknameForm>,
) -> PageResult<Response> {
    let mut student = with_role(user, Role::Student)?;
    change_nickname(&state, &mut student, &form.nickname).await?;
    Ok(Redirect::to("/student").into_response())
}

/// GET /admin
pub async fn admin(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult {
    let admin = with_role(user, Role::Admin)?;
    let courses = queries::list_courses(state.db.pool()).await?;
    let subjects = queries::list_subjects(state.db.pool(), None).await?;

    Ok(render(
        "Admin",
        Some(&admin),
        html! {
            h1 { "Courses & Subjects" }
            section {
                h2 { "Courses" }
                ul {
                    @for course in &courses {
                        li {
                            (course.name) " "
                            form class="inline" method="post" action={ "/admin/courses/" (course.id) "/delete" } {
                                button type="submit" { "Delete" }
                            }
                        }
                    }
                }
                form method="post" action="/admin/courses" class="card" {
                    input type="text" name="name" required placeholder="Course name";
                    " "
                    button type="submit" { "Add course" }
                }
            }
            section {
                h2 { "Subjects" }
                ul {
                    @for subject in &subjects {
                        li {
                            (subject.name) " "
                            span class="meta" {
                                (courses.iter().find(|c| c.id == subject.course_id).map_or("?", |c| c.name.as_str()))
                                " · " (subject.semester)
                            }
                            " "
                            form class="inline" method="post" action={ "/admin/subjects/" (subject.id) "/delete" } {
                                button type="submit" { "Delete" }
                            }
                        }
                    }
                }
                @if courses.is_empty() {
                    p class="meta" { "Add a course before adding subjects." }
                } @else {
                    form method="post" action="/admin/subjects" class="card" {
                        select name="course_id" {
                            @for course in &courses {
                                option value=(course.id) { (course.name) }
                            }
                        }
                        " "
                        select name="semester" {
                            @for semester in SEMESTERS {
                                option value=(semester) { (semester) }
                            }
                        }
                        " "
                        input type="text" name="name" required placeholder="Subject name";
                        " "
                        button type="submit" { "Add subject" }
                    }
                }
            }
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct CourseForm {
    name: String,
}

/// POST /admin/courses
pub async fn add_course(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<CourseForm>,
) -> PageResult<Response> {
    with_role(user, Role::Admin)?;
    create_course(&state, &form.name).await?;
    Ok(Redirect::to("/admin").into_response())
}

/// POST /admin/courses/:id/delete
pub async fn delete_course(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    with_role(user, Role::Admin)?;
    if !queries::delete_course(state.db.pool(), id).await? {
        return Err(ApiError::not_found("Course not found").into());
    }
    Ok(Redirect::to("/admin").into_response())
}

/// POST /admin/subjects
pub async fn add_subject(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<SubjectBody>,
) -> PageResult<Response> {
    with_role(user, Role::Admin)?;
    create_subject(&state, &form).await?;
    Ok(Redirect::to("/admin").into_response())
}

/// POST /admin/subjects/:id/delete
pub async fn delete_subject(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    with_role(user, Role::Admin)?;
    if !queries::delete_subject(state.db.pool(), id).await? {
        return Err(ApiError::not_found("Subject not found").into());
    }
    Ok(Redirect::to("/admin").into_response())
}
