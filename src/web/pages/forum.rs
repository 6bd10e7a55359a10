use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use maud::{html, Markup};
use serde::Deserialize;

use super::{render, signed_in, PageResult};
use crate::auth::MaybeUser;
use crate::db::{self as queries, PostSummary, Profile};
use crate::error::ApiError;
use crate::forum::{compose_feed, normalize_tags, search_questions, TagFilter};
use crate::vocab::{ALL_COURSES, ALL_SEMESTERS, ALL_SUBJECTS, COURSES, MISCELLANEOUS, SEMESTERS};
use crate::web::api::comments::add_comment;
use crate::web::api::posts::{
    apply_edit, build_semester_view, load_summary, publish, remove_post, PostBody, PostQuery,
};
use crate::web::layout::{empty_state, post_card, tag_list};
use crate::web::AppState;

/// GET /home - Trending posts, then the latest ones.
pub async fn home(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult {
    let user = signed_in(user)?;
    let posts = queries::list_post_summaries(state.db.pool()).await?;
    let feed = compose_feed(posts, state.config.trending_count);

    Ok(render(
        "Home",
        Some(&user),
        html! {
            h1 { "Welcome, " (user.display_name()) }
            p { a href="/questions#ask" { "Ask a question" } }
            section {
                h2 { "Trending" }
                @if feed.trending.is_empty() {
                    (empty_state("Nothing trending yet."))
                }
                @for post in &feed.trending {
                    (post_card(post))
                }
            }
            section {
                h2 { "Latest" }
                @if feed.latest.is_empty() {
                    (empty_state("No other posts yet."))
                }
                @for post in &feed.latest {
                    (post_card(post))
                }
            }
        },
    ))
}

/// GET /questions?q=&tags=
pub async fn questions(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PostQuery>,
) -> PageResult {
    let user = signed_in(user)?;
    let posts = queries::list_post_summaries(state.db.pool()).await?;
    let q = query.q.as_deref().unwrap_or_default();
    let selected = query.selected_tags();
    let results = search_questions(&posts, q, &selected);

    Ok(render(
        "Questions",
        Some(&user),
        html! {
            h1 { "Questions" }
            form method="get" action="/questions" class="card" {
                input type="search" name="q" value=(q) placeholder="Search titles and tags";
                " "
                input type="text" name="tags" value=(selected.join(", ")) placeholder="Required tags, comma separated";
                " "
                button type="submit" { "Search" }
            }
            @if results.is_empty() {
                (empty_state("No matching questions."))
            }
            @for post in &results {
                (post_card(post))
            }
            h2 id="ask" { "Ask a question" }
            (post_form("/questions", None, &user))
        },
    ))
}

/// Post form fields. Tags arrive as one comma separated field plus the
/// optional course / semester / subject selections.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    title: String,
    content: String,
    #[serde(default)]
    tags: String,
    course: Option<String>,
    semester: Option<String>,
    subject: Option<String>,
}

impl PostForm {
    fn into_body(self) -> PostBody {
        let tags = normalize_tags(
            self.tags
                .split(',')
                .chain(self.course.as_deref())
                .chain(self.semester.as_deref())
                .chain(self.subject.as_deref()),
        );
        PostBody {
            title: self.title,
            content: self.content,
            tags,
            attachments: None,
        }
    }
}

fn post_form(action: &str, existing: Option<&PostSummary>, user: &Profile) -> Markup {
    let title = existing.map_or("", |p| p.title.as_str());
    let content = existing.map_or("", |p| p.content.as_str());
    let tags = existing.map(|p| p.tags.join(", ")).unwrap_or_default();

    html! {
        form method="post" action=(action) class="card" {
            p {
                label for="title" { "Title" } br;
                input type="text" id="title" name="title" value=(title) required;
            }
            p {
                label for="content" { "Details" } br;
                textarea id="content" name="content" rows="6" required { (content) }
            }
            p {
                label for="tags" { "Tags" } br;
                input type="text" id="tags" name="tags" value=(tags) placeholder="DBMS, Questions";
            }
            @if existing.is_none() {
                p {
                    select name="course" {
                        option value="" { "No course" }
                        @for course in COURSES {
                            option value=(course) selected[user.course.as_deref() == Some(course)] { (course) }
                        }
                    }
                    " "
                    select name="semester" {
                        option value="" { "No semester" }
                        @for semester in SEMESTERS {
                            option value=(semester) selected[user.semester.as_deref() == Some(semester)] { (semester) }
                        }
                    }
                }
            }
            button type="submit" { @if existing.is_some() { "Save" } @else { "Post" } }
        }
    }
}

/// POST /questions - Create a post from the form.
pub async fn ask(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<PostForm>,
) -> PageResult<Response> {
    let user = signed_in(user)?;
    let id = publish(&state, &user, &form.into_body()).await?;
    Ok(Redirect::to(&format!("/post/{id}")).into_response())
}

/// GET /post/:id
pub async fn post_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult {
    let user = signed_in(user)?;
    let post = load_summary(&state, id).await?;
    let comments = queries::list_comments_for_post(state.db.pool(), id).await?;
    let has_voted = queries::has_user_voted(state.db.pool(), id, user.id).await?;
    let is_author = post.author_id == user.id;

    Ok(render(
        &post.title,
        Some(&user),
        html! {
            article class="card" {
                h1 { (post.title) }
                p class="meta" { "Asked by " (post.author) " on " (post.created_at) }
                div { (tag_list(&post.tags)) }
                p style="white-space: pre-wrap;" { (post.content) }
                @if !post.attachments.is_empty() {
                    h3 { "Attachments" }
                    ul {
                        @for attachment in &post.attachments {
                            li { a href=(attachment.url) { (attachment.name) } " (" (attachment.size) " bytes)" }
                        }
                    }
                }
                form class="inline" method="post" action={ "/post/" (post.id) "/vote" } {
                    button type="submit" {
                        @if has_voted { "Remove vote" } @else { "Upvote" }
                    }
                }
                " " strong { (post.votes) } " votes"
                @if is_author {
                    " · " a href={ "/edit-post/" (post.id) } { "Edit" } " · "
                    form class="inline" method="post" action={ "/post/" (post.id) "/delete" } {
                        button type="submit" { "Delete" }
                    }
                }
            }
            section {
                h2 { (comments.len()) " comments" }
                form method="post" action={ "/post/" (post.id) "/comments" } class="card" {
                    textarea name="content" rows="3" required placeholder="Write an answer" {}
                    br;
                    button type="submit" { "Comment" }
                }
                @for comment in &comments {
                    div class="card" {
                        p class="meta" { strong { (comment.author_name()) } " · " (comment.created_at) }
                        p style="white-space: pre-wrap;" { (comment.content) }
                    }
                }
            }
        },
    ))
}

/// POST /post/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    let user = signed_in(user)?;
    queries::handle_vote(state.db.pool(), id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(Redirect::to(&format!("/post/{id}")).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    content: String,
}

/// POST /post/:id/comments
pub async fn comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> PageResult<Response> {
    let user = signed_in(user)?;
    add_comment(&state, &user, id, &form.content).await?;
    Ok(Redirect::to(&format!("/post/{id}")).into_response())
}

/// POST /post/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    let user = signed_in(user)?;
    remove_post(&state, &user, id).await?;
    Ok(Redirect::to("/home").into_response())
}

/// GET /edit-post/:id - Author only.
pub async fn edit_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> PageResult {
    let user = signed_in(user)?;
    let post = load_summary(&state, id).await?;
    if post.author_id != user.id {
        return Err(ApiError::forbidden("Only the author can edit this post").into());
    }

    Ok(render(
        "Edit post",
        Some(&user),
        html! {
            h1 { "Edit post" }
            (post_form(&format!("/edit-post/{id}"), Some(&post), &user))
        },
    ))
}

/// POST /edit-post/:id
pub async fn edit_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> PageResult<Response> {
    let user = signed_in(user)?;
    apply_edit(&state, &user, id, &form.into_body()).await?;
    Ok(Redirect::to(&format!("/post/{id}")).into_response())
}

/// GET /semester-view?course=&semester=&subject=
pub async fn semester_view(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PostQuery>,
) -> PageResult {
    let user = signed_in(user)?;
    let view = build_semester_view(&state, &query).await?;
    let selection = &view.selection;

    Ok(render(
        "Semester View",
        Some(&user),
        html! {
            h1 { "Semester View" }
            form method="get" action="/semester-view" class="card" {
                select name="course" {
                    option value=(ALL_COURSES) { (ALL_COURSES) }
                    @for course in COURSES {
                        option value=(course) selected[selection.course == course] { (course) }
                    }
                }
                " "
                select name="semester" {
                    option value=(ALL_SEMESTERS) { (ALL_SEMESTERS) }
                    @for semester in SEMESTERS {
                        option value=(semester) selected[selection.semester == semester] { (semester) }
                    }
                    option value=(MISCELLANEOUS) selected[selection.semester == MISCELLANEOUS] {
                        (MISCELLANEOUS)
                    }
                }
                " "
                select name="subject" disabled[view.subjects.is_empty()] {
                    option value=(ALL_SUBJECTS) { (ALL_SUBJECTS) }
                    @for subject in &view.subjects {
                        option value=(subject) selected[&selection.subject == subject] { (subject) }
                    }
                }
                " "
                button type="submit" { "Apply" }
            }
            @if view.grouped {
                @if view.buckets.is_empty() {
                    (empty_state("No posts match this selection."))
                }
                @for bucket in &view.buckets {
                    section {
                        h2 {
                            (bucket.semester) " "
                            small {
                                a href={ "/semester-view?" (narrowed(&selection.course, bucket.semester, &selection.subject)) } {
                                    "view only this semester"
                                }
                            }
                        }
                        @for post in &bucket.posts {
                            (post_card(post))
                        }
                    }
                }
            } @else {
                @if view.posts.is_empty() {
                    (empty_state("No posts match this selection."))
                }
                @for post in &view.posts {
                    (post_card(post))
                }
                p {
                    a href={ "/semester-view?" (narrowed(&selection.course, ALL_SEMESTERS, &selection.subject)) } {
                        "Show all semesters"
                    }
                }
            }
        },
    ))
}

/// Query string for the current selection with a different semester.
fn narrowed(course: &str, semester: &str, subject: &str) -> String {
    TagFilter::from_selection(course, semester, subject).to_query()
}
