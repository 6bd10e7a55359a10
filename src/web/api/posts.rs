use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{required, MAX_FILES_PER_UPLOAD};
use crate::auth::{MaybeUser, RequireUser};
use crate::db::{self as queries, Attachment, NewPost, PostEdit, PostSummary, Profile, VoteOutcome};
use crate::error::{ApiError, StorageError};
use crate::forum::{
    compose_feed, delete_post_with_attachments, filter_posts, generate_preview, group_by_semester,
    normalize_tags, reconcile_subject, search_questions, subjects_for, DeletionReport, Feed,
    SemesterBucket, TagFilter,
};
use crate::storage::generate_object_key;
use crate::web::AppState;

const MAX_TITLE_LEN: usize = 200;

/// Filter and search parameters accepted by the post listings.
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub course: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
    /// Free-text search over titles and tag names
    pub q: Option<String>,
    /// Comma separated tag names that must all be present
    pub tags: Option<String>,
}

impl PostQuery {
    pub(crate) fn filter(&self) -> TagFilter {
        TagFilter::from_selection(
            self.course.as_deref().unwrap_or_default(),
            self.semester.as_deref().unwrap_or_default(),
            self.subject.as_deref().unwrap_or_default(),
        )
    }

    pub(crate) fn selected_tags(&self) -> Vec<String> {
        normalize_tags(self.tags.as_deref().unwrap_or_default().split(','))
    }
}

/// GET /api/posts
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let posts = queries::list_post_summaries(state.db.pool()).await?;
    let posts = filter_posts(&posts, &query.filter());
    let posts = search_questions(
        &posts,
        query.q.as_deref().unwrap_or_default(),
        &query.selected_tags(),
    );
    Ok(Json(posts))
}

/// GET /api/posts/feed
pub async fn feed(State(state): State<AppState>) -> Result<Json<Feed>, ApiError> {
    let posts = queries::list_post_summaries(state.db.pool()).await?;
    Ok(Json(compose_feed(posts, state.config.trending_count)))
}

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub course: String,
    pub semester: String,
    pub subject: String,
}

/// Posts of the semester view, grouped when no semester is selected.
#[derive(Debug, Serialize)]
pub struct SemesterView {
    pub selection: SelectionView,
    pub subjects: Vec<String>,
    pub grouped: bool,
    pub buckets: Vec<SemesterBucket<PostSummary>>,
    pub posts: Vec<PostSummary>,
}

/// Build the semester view, resetting a subject that is no longer offered.
pub(crate) async fn build_semester_view(
    state: &AppState,
    query: &PostQuery,
) -> Result<SemesterView, ApiError> {
    let mut filter = query.filter();

    let managed = match (&filter.course, &filter.semester) {
        (Some(course), Some(semester)) => {
            queries::subject_names_for(state.db.pool(), course, semester).await?
        }
        _ => Vec::new(),
    };
    let subjects = subjects_for(filter.course_label(), filter.semester_label(), &managed);
    let subject = reconcile_subject(filter.subject_label(), &subjects);
    filter = TagFilter::from_selection(filter.course_label(), filter.semester_label(), &subject);

    let posts = queries::list_post_summaries(state.db.pool()).await?;
    let visible = filter_posts(&posts, &filter);
    let grouped = filter.groups_by_semester();

    let (buckets, posts) = if grouped {
        (group_by_semester(visible), Vec::new())
    } else {
        (Vec::new(), visible)
    };

    Ok(SemesterView {
        selection: SelectionView {
            course: filter.course_label().to_string(),
            semester: filter.semester_label().to_string(),
            subject: filter.subject_label().to_string(),
        },
        subjects,
        grouped,
        buckets,
        posts,
    })
}

/// GET /api/posts/semester-view
pub async fn semester_view(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<SemesterView>, ApiError> {
    Ok(Json(build_semester_view(&state, &query).await?))
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    /// Present when the request is signed in
    pub has_voted: Option<bool>,
}

/// GET /api/posts/:id
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    let post = load_summary(&state, id).await?;
    let has_voted = match user {
        Some(user) => Some(queries::has_user_voted(state.db.pool(), id, user.id).await?),
        None => None,
    };
    Ok(Json(PostDetail { post, has_voted }))
}

#[derive(Debug, Deserialize)]
pub struct PostBody {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attachments to keep when editing; omitted means unchanged
    pub attachments: Option<Vec<Attachment>>,
}

struct ValidPost {
    title: String,
    content: String,
    tags: Vec<String>,
}

fn validate_post(body: &PostBody) -> Result<ValidPost, ApiError> {
    let title = required(&body.title, "title")?;
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    let content = required(&body.content, "content")?;
    Ok(ValidPost {
        title,
        content,
        tags: normalize_tags(&body.tags),
    })
}

/// Create a post for `author`, returning its id.
pub(crate) async fn publish(
    state: &AppState,
    author: &Profile,
    body: &PostBody,
) -> Result<i64, ApiError> {
    let post = validate_post(body)?;
    let id = queries::create_post(
        state.db.pool(),
        &NewPost {
            author_id: author.id,
            preview: generate_preview(&post.content),
            title: post.title,
            content: post.content,
            tags: post.tags,
        },
    )
    .await?;

    tracing::info!(post_id = id, author_id = author.id, "Created post");
    state.alerts.notify_activity();
    Ok(id)
}

/// POST /api/posts
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<PostBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = publish(&state, &user, &body).await?;
    Ok((StatusCode::CREATED, Json(load_summary(&state, id).await?)))
}

/// Apply an author's edit. Removed attachments are deleted from storage.
pub(crate) async fn apply_edit(
    state: &AppState,
    user: &Profile,
    id: i64,
    body: &PostBody,
) -> Result<PostSummary, ApiError> {
    let existing = load_summary(state, id).await?;
    ensure_author(&existing, user)?;
    let post = validate_post(body)?;

    // Attachments the author saw and left out of the kept list.
    let omitted: Vec<String> = match &body.attachments {
        Some(keep) => existing
            .attachments
            .iter()
            .filter(|a| !keep.iter().any(|k| k.key == a.key))
            .map(|a| a.key.clone())
            .collect(),
        None => Vec::new(),
    };

    let removed = queries::update_post(
        state.db.pool(),
        id,
        &PostEdit {
            preview: generate_preview(&post.content),
            title: post.title,
            content: post.content,
            tags: post.tags,
            remove_attachments: omitted,
        },
    )
    .await?;

    for attachment in &removed {
        if let Err(e) = state.store.delete(&attachment.key).await {
            tracing::warn!(post_id = id, key = %attachment.key, "Failed to delete removed attachment: {e}");
        }
    }

    state.alerts.notify_activity();
    load_summary(state, id).await
}

/// PUT /api/posts/:id - Author only.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
    Json(body): Json<PostBody>,
) -> Result<Json<PostSummary>, ApiError> {
    Ok(Json(apply_edit(&state, &user, id, &body).await?))
}

/// Delete an author's post and its stored attachments.
pub(crate) async fn remove_post(
    state: &AppState,
    user: &Profile,
    id: i64,
) -> Result<DeletionReport, ApiError> {
    let existing = load_summary(state, id).await?;
    ensure_author(&existing, user)?;

    let report = delete_post_with_attachments(state.db.pool(), state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    state.alerts.notify_activity();
    Ok(report)
}

/// DELETE /api/posts/:id - Author only.
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletionReport>, ApiError> {
    Ok(Json(remove_post(&state, &user, id).await?))
}

/// POST /api/posts/:id/vote - Toggle the caller's vote.
pub async fn vote(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let outcome = queries::handle_vote(state.db.pool(), id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(Json(outcome))
}

/// POST /api/posts/:id/attachments - Author only, multipart.
pub async fn upload_attachments(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let existing = load_summary(&state, id).await?;
    ensure_author(&existing, &user)?;

    let mut uploaded: Vec<Attachment> = Vec::new();
    let stored = match store_fields(&state, &mut multipart, &mut uploaded).await {
        Ok(()) => queries::add_post_attachments(state.db.pool(), id, &uploaded)
            .await
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };

    let attachments = match stored {
        Ok(attachments) => attachments,
        Err(e) => {
            discard_uploads(&state, id, &uploaded).await;
            return Err(e);
        }
    };
    tracing::info!(post_id = id, files = uploaded.len(), "Stored attachments");

    Ok((StatusCode::CREATED, Json(attachments)))
}

/// Read every file field and store it, recording each stored object in `uploaded`.
async fn store_fields(
    state: &AppState,
    multipart: &mut Multipart,
    uploaded: &mut Vec<Attachment>,
) -> Result<(), ApiError> {
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e, limit))? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if uploaded.len() >= MAX_FILES_PER_UPLOAD {
            return Err(ApiError::validation(format!(
                "at most {MAX_FILES_PER_UPLOAD} files per upload"
            )));
        }

        let content_type = field.content_type().map_or_else(
            || {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            },
            str::to_string,
        );
        let data = field.bytes().await.map_err(|e| multipart_error(&e, limit))?;
        if data.is_empty() {
            return Err(ApiError::validation(format!("'{file_name}' is empty")));
        }
        if data.len() > limit {
            return Err(StorageError::TooLarge { limit }.into());
        }

        let key = generate_object_key(&state.config.s3_prefix, &file_name);
        state.store.put(&key, &data, &content_type).await?;

        uploaded.push(Attachment {
            url: state.store.public_url(&key),
            key,
            name: file_name,
            size: i64::try_from(data.len()).unwrap_or(i64::MAX),
        });
    }

    if uploaded.is_empty() {
        return Err(ApiError::validation("no files in upload"));
    }
    Ok(())
}

/// Remove objects stored by an upload that failed part way.
async fn discard_uploads(state: &AppState, id: i64, uploaded: &[Attachment]) {
    for attachment in uploaded {
        if let Err(e) = state.store.delete(&attachment.key).await {
            tracing::warn!(post_id = id, key = %attachment.key, "Failed to delete orphaned upload: {e}");
        }
    }
}

fn multipart_error(err: &axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StorageError::TooLarge { limit }.into()
    } else {
        ApiError::validation(format!("invalid multipart body: {}", err.body_text()))
    }
}

pub(crate) async fn load_summary(state: &AppState, id: i64) -> Result<PostSummary, ApiError> {
    queries::get_post_summary(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

fn ensure_author(post: &PostSummary, user: &Profile) -> Result<(), ApiError> {
    if post.author_id == user.id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the author can change this post"))
    }
}
