use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;

use super::models::{
    now_timestamp, AssignmentDisplay, Attachment, CommentDisplay, Course, MagicLink,
    ModeratorAssignment, NewMagicLink, NewPost, NewProfile, Post, PostEdit, PostRow, PostSummary,
    Profile, Role, Session, StudentStats, Subject, Tag, TimeSlot, VoteOutcome,
};

// ========== Profiles ==========

/// Get a profile by ID.
pub async fn get_profile_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Profile>> {
    sqlx::query_as("SELECT * FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch profile by id")
}

/// Get a profile by email (case-insensitive).
pub async fn get_profile_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Profile>> {
    sqlx::query_as("SELECT * FROM profiles WHERE email = ? COLLATE NOCASE")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch profile by email")
}

/// Check whether a username is taken.
pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await
        .context("Failed to check username")?;
    Ok(count > 0)
}

/// Insert a new profile, returning its ID.
pub async fn create_profile(pool: &SqlitePool, profile: &NewProfile) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO profiles (email, username, role, course, semester, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(profile.email.to_lowercase())
    .bind(&profile.username)
    .bind(profile.role.as_str())
    .bind(&profile.course)
    .bind(&profile.semester)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to insert profile")?;

    Ok(result.last_insert_rowid())
}

/// Update the course and semester of a profile.
pub async fn update_profile_academics(
    pool: &SqlitePool,
    id: i64,
    course: Option<&str>,
    semester: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE profiles SET course = ?, semester = ? WHERE id = ?")
        .bind(course)
        .bind(semester)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update profile academics")?;
    Ok(())
}

/// Set the nickname unless it was already set once.
///
/// Returns `false` when the nickname had already been changed.
pub async fn set_nickname_once(pool: &SqlitePool, id: i64, nickname: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE profiles SET nickname = ?, nickname_changed = 1 WHERE id = ? AND nickname_changed = 0",
    )
    .bind(nickname)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to set nickname")?;

    Ok(result.rows_affected() == 1)
}

/// List profiles with the given role, ordered by username.
pub async fn list_profiles_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<Profile>> {
    sqlx::query_as("SELECT * FROM profiles WHERE role = ? ORDER BY username")
        .bind(role.as_str())
        .fetch_all(pool)
        .await
        .context("Failed to list profiles by role")
}

/// Count posts and comments written by a user.
pub async fn get_student_stats(pool: &SqlitePool, user_id: i64) -> Result<StudentStats> {
    let post_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    let comment_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    Ok(StudentStats {
        post_count,
        comment_count,
    })
}

// ========== Sessions ==========

/// Create a new session, returning its ID.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: &str,
) -> Result<i64> {
    let now = now_timestamp();
    let result = sqlx::query(
        r"
        INSERT INTO sessions (token, user_id, expires_at, created_at, last_used_at)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(result.last_insert_rowid())
}

/// Get a session by token.
pub async fn get_session_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    sqlx::query_as("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch session")
}

/// Update a session's last_used_at timestamp.
pub async fn update_session_last_used(pool: &SqlitePool, session_id: i64) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
        .bind(now_timestamp())
        .bind(session_id)
        .execute(pool)
        .await
        .context("Failed to update session")?;
    Ok(())
}

/// Delete a session by token.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

/// Delete all sessions that expired before now.
pub async fn delete_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now_timestamp())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

// ========== Magic Links ==========

/// Store a freshly issued magic link.
pub async fn create_magic_link(pool: &SqlitePool, link: &NewMagicLink) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO magic_links (token_hash, email, role, course, semester, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&link.token_hash)
    .bind(link.email.to_lowercase())
    .bind(link.role.as_str())
    .bind(&link.course)
    .bind(&link.semester)
    .bind(&link.expires_at)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to insert magic link")?;

    Ok(result.last_insert_rowid())
}

/// Mark a magic link as used and return it.
///
/// Returns `None` when the hash is unknown, expired, or already consumed.
/// The update is conditional so two concurrent callbacks cannot both succeed.
pub async fn consume_magic_link(pool: &SqlitePool, token_hash: &str) -> Result<Option<MagicLink>> {
    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r"
        UPDATE magic_links SET consumed_at = ?
        WHERE token_hash = ? AND consumed_at IS NULL AND expires_at > ?
        ",
    )
    .bind(&now)
    .bind(token_hash)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .context("Failed to consume magic link")?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let link: MagicLink = sqlx::query_as("SELECT * FROM magic_links WHERE token_hash = ?")
        .bind(token_hash)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read consumed magic link")?;

    tx.commit().await?;
    Ok(Some(link))
}

/// Delete magic links that expired or were used.
pub async fn delete_stale_magic_links(pool: &SqlitePool) -> Result<u64> {
    let result =
        sqlx::query("DELETE FROM magic_links WHERE expires_at < ? OR consumed_at IS NOT NULL")
            .bind(now_timestamp())
            .execute(pool)
            .await
            .context("Failed to delete stale magic links")?;
    Ok(result.rows_affected())
}

// ========== Tags ==========

/// Insert the given tag names when the tag table is empty.
///
/// Returns the number of tags inserted (zero when tags already exist).
pub async fn seed_default_tags(pool: &SqlitePool, names: &[&str]) -> Result<u64> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(pool)
        .await
        .context("Failed to count tags")?;
    if existing > 0 {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for name in names {
        let result = sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await
            .context("Failed to seed tag")?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;

    Ok(inserted)
}

/// List all tags ordered by name.
pub async fn list_tags(pool: &SqlitePool) -> Result<Vec<Tag>> {
    sqlx::query_as("SELECT id, name FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")
}

/// Find tags whose name contains the query (ASCII case-insensitive).
pub async fn search_tags(pool: &SqlitePool, query: &str, limit: i64) -> Result<Vec<Tag>> {
    let pattern = format!("%{}%", escape_like(query));
    sqlx::query_as("SELECT id, name FROM tags WHERE name LIKE ? ESCAPE '\\' ORDER BY name LIMIT ?")
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to search tags")
}

/// Create a tag if missing and return it.
pub async fn get_or_create_tag(pool: &SqlitePool, name: &str) -> Result<Tag> {
    let mut tx = pool.begin().await?;
    let tag = get_or_create_tag_tx(&mut tx, name).await?;
    tx.commit().await?;
    Ok(tag)
}

async fn get_or_create_tag_tx(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<Tag> {
    sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut **tx)
        .await
        .context("Failed to insert tag")?;

    sqlx::query_as("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to fetch tag")
}

async fn link_post_tags(tx: &mut Transaction<'_, Sqlite>, post_id: i64, tags: &[String]) -> Result<()> {
    for name in tags {
        let tag = get_or_create_tag_tx(tx, name).await?;
        sqlx::query("INSERT OR IGNORE INTO posts_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await
            .context("Failed to link tag to post")?;
    }
    Ok(())
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ========== Posts ==========

const POST_SUMMARY_SELECT: &str = r"
    SELECT
        p.id,
        p.title,
        p.preview,
        p.content,
        p.votes,
        p.created_at,
        p.author_id,
        pr.username AS author,
        pr.role AS author_role,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
        p.attachments
    FROM posts p
    LEFT JOIN profiles pr ON pr.id = p.author_id
";

/// Insert a new post with its tags, returning its ID.
///
/// Unknown tag names are created.
pub async fn create_post(pool: &SqlitePool, post: &NewPost) -> Result<i64> {
    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r"
        INSERT INTO posts (author_id, title, content, preview, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.preview)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .context("Failed to insert post")?;

    let post_id = result.last_insert_rowid();
    link_post_tags(&mut tx, post_id, &post.tags).await?;
    tx.commit().await?;

    Ok(post_id)
}

/// Get a post row by ID.
pub async fn get_post(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")
}

/// Get a post joined with author, tags and comment count.
pub async fn get_post_summary(pool: &SqlitePool, id: i64) -> Result<Option<PostSummary>> {
    let row: Option<PostRow> = sqlx::query_as(&format!("{POST_SUMMARY_SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post summary")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let tags = get_tag_names_for_post(pool, id).await?;
    Ok(Some(row.into_summary(tags)))
}

/// List every post with author, tags and comment count, newest first.
pub async fn list_post_summaries(pool: &SqlitePool) -> Result<Vec<PostSummary>> {
    let rows: Vec<PostRow> = sqlx::query_as(&format!(
        "{POST_SUMMARY_SELECT} ORDER BY p.created_at DESC, p.id DESC"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    attach_tags(pool, rows).await
}

/// List posts that have no comment yet, oldest first.
pub async fn list_uncommented_posts(pool: &SqlitePool) -> Result<Vec<PostSummary>> {
    let rows: Vec<PostRow> = sqlx::query_as(&format!(
        r"{POST_SUMMARY_SELECT}
        WHERE NOT EXISTS (SELECT 1 FROM comments c WHERE c.post_id = p.id)
        ORDER BY p.created_at ASC, p.id ASC"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list uncommented posts")?;

    attach_tags(pool, rows).await
}

/// Tag names of one post, sorted by name.
pub async fn get_tag_names_for_post(pool: &SqlitePool, post_id: i64) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r"
        SELECT t.name
        FROM posts_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ?
        ORDER BY t.name
        ",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to fetch post tags")?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Fetch the whole tag join once and distribute names to rows.
async fn attach_tags(pool: &SqlitePool, rows: Vec<PostRow>) -> Result<Vec<PostSummary>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let links: Vec<(i64, String)> = sqlx::query_as(
        r"
        SELECT pt.post_id, t.name
        FROM posts_tags pt
        JOIN tags t ON t.id = pt.tag_id
        ORDER BY pt.post_id, t.name
        ",
    )
    .fetch_all(pool)
    .await
    .context("Failed to fetch post tag links")?;

    let mut by_post: HashMap<i64, Vec<String>> = HashMap::new();
    for (post_id, name) in links {
        by_post.entry(post_id).or_default().push(name);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = by_post.remove(&row.id).unwrap_or_default();
            row.into_summary(tags)
        })
        .collect())
}

/// Replace a post's title, content and tags, and detach the listed attachments.
///
/// The attachment list is re-read after the write lock is taken, so uploads that
/// commit concurrently are kept. Returns the attachments that were detached so the
/// caller can remove the stored objects.
pub async fn update_post(pool: &SqlitePool, id: i64, edit: &PostEdit) -> Result<Vec<Attachment>> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r"
        UPDATE posts
        SET title = ?, content = ?, preview = ?, updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(&edit.title)
    .bind(&edit.content)
    .bind(&edit.preview)
    .bind(now_timestamp())
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update post")?;
    if updated.rows_affected() == 0 {
        anyhow::bail!("post {id} does not exist");
    }

    let mut dropped = Vec::new();
    if !edit.remove_attachments.is_empty() {
        let raw: Option<String> = sqlx::query_scalar("SELECT attachments FROM posts WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to read attachments")?;

        let (kept, removed): (Vec<Attachment>, Vec<Attachment>) =
            super::models::decode_attachments(raw.as_deref())
                .into_iter()
                .partition(|a| !edit.remove_attachments.contains(&a.key));

        if !removed.is_empty() {
            let encoded = if kept.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&kept).context("Failed to encode attachments")?)
            };
            sqlx::query("UPDATE posts SET attachments = ? WHERE id = ?")
                .bind(encoded)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to store attachments")?;
        }
        dropped = removed;
    }

    sqlx::query("DELETE FROM posts_tags WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear post tags")?;

    link_post_tags(&mut tx, id, &edit.tags).await?;
    tx.commit().await?;

    Ok(dropped)
}

/// Append attachments to a post.
pub async fn add_post_attachments(
    pool: &SqlitePool,
    id: i64,
    new_attachments: &[Attachment],
) -> Result<Vec<Attachment>> {
    let mut tx = pool.begin().await?;

    // Write first so the read below happens under the write lock.
    let touched = sqlx::query("UPDATE posts SET updated_at = ? WHERE id = ?")
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to touch post")?;
    if touched.rows_affected() == 0 {
        anyhow::bail!("post {id} does not exist");
    }

    let raw: Option<String> = sqlx::query_scalar("SELECT attachments FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read attachments")?;

    let mut attachments = super::models::decode_attachments(raw.as_deref());
    attachments.extend_from_slice(new_attachments);

    sqlx::query("UPDATE posts SET attachments = ? WHERE id = ?")
        .bind(serde_json::to_string(&attachments).context("Failed to encode attachments")?)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to store attachments")?;

    tx.commit().await?;
    Ok(attachments)
}

/// Delete a post and every row hanging off it in one transaction.
///
/// Returns the attachments the post referenced so the caller can remove the
/// stored objects, or `None` if the post did not exist.
pub async fn delete_post_rows(pool: &SqlitePool, id: i64) -> Result<Option<Vec<Attachment>>> {
    let mut tx = pool.begin().await?;

    let post: Option<Post> = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch post for deletion")?;
    let Some(post) = post else {
        return Ok(None);
    };

    for (table, label) in [
        ("comments", "comments"),
        ("posts_tags", "tag links"),
        ("user_votes", "votes"),
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE post_id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete {label} of post {id}"))?;
    }

    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    tx.commit().await?;
    Ok(Some(post.attachment_list()))
}

// ========== Comments ==========

/// Insert a comment, returning its ID.
pub async fn create_comment(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
    content: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO comments (post_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(content)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to insert comment")?;

    Ok(result.last_insert_rowid())
}

/// Comments of a post with author names, newest first.
pub async fn list_comments_for_post(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentDisplay>> {
    sqlx::query_as(
        r"
        SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, pr.username, pr.nickname
        FROM comments c
        LEFT JOIN profiles pr ON pr.id = c.user_id
        WHERE c.post_id = ?
        ORDER BY c.created_at DESC, c.id DESC
        ",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")
}

// ========== Votes ==========

/// Toggle a user's vote on a post and return the authoritative result.
///
/// Removing an existing vote decrements the counter, otherwise a vote row is
/// inserted and the counter incremented. Both happen in one transaction.
/// Returns `None` if the post does not exist.
pub async fn handle_vote(pool: &SqlitePool, post_id: i64, user_id: i64) -> Result<Option<VoteOutcome>> {
    let mut tx = pool.begin().await?;

    // Writing first takes the lock before anything is read.
    let removed = sqlx::query("DELETE FROM user_votes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to remove vote")?
        .rows_affected()
        > 0;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to check post")?;
    if exists.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    if removed {
        sqlx::query("UPDATE posts SET votes = MAX(votes - 1, 0) WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement votes")?;
    } else {
        sqlx::query("INSERT INTO user_votes (post_id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(now_timestamp())
            .execute(&mut *tx)
            .await
            .context("Failed to insert vote")?;
        sqlx::query("UPDATE posts SET votes = votes + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment votes")?;
    }

    let votes: i64 = sqlx::query_scalar("SELECT votes FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read vote count")?;

    tx.commit().await?;

    Ok(Some(VoteOutcome {
        post_id,
        voted: !removed,
        votes,
    }))
}

/// Whether a user currently votes for a post.
pub async fn has_user_voted(pool: &SqlitePool, post_id: i64, user_id: i64) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_votes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("Failed to check vote")?;
    Ok(count > 0)
}

// ========== Moderator Assignments ==========

/// Assign a student to a time slot, replacing whoever held it.
pub async fn assign_moderator(
    pool: &SqlitePool,
    student_id: i64,
    slot: TimeSlot,
    assigned_by: i64,
) -> Result<ModeratorAssignment> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM moderator_assignments WHERE time_slot = ?")
        .bind(slot.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to clear time slot")?;

    let result = sqlx::query(
        r"
        INSERT INTO moderator_assignments (student_id, time_slot, assigned_by, created_at)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(student_id)
    .bind(slot.as_str())
    .bind(assigned_by)
    .bind(now_timestamp())
    .execute(&mut *tx)
    .await
    .context("Failed to insert moderator assignment")?;

    let assignment = sqlx::query_as("SELECT * FROM moderator_assignments WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read moderator assignment")?;

    tx.commit().await?;
    Ok(assignment)
}

/// Remove the assignment for a slot. Returns whether one existed.
pub async fn unassign_slot(pool: &SqlitePool, slot: TimeSlot) -> Result<bool> {
    let result = sqlx::query("DELETE FROM moderator_assignments WHERE time_slot = ?")
        .bind(slot.as_str())
        .execute(pool)
        .await
        .context("Failed to delete moderator assignment")?;
    Ok(result.rows_affected() > 0)
}

/// All assignments with student usernames, ordered by slot.
pub async fn list_assignments(pool: &SqlitePool) -> Result<Vec<AssignmentDisplay>> {
    let mut assignments: Vec<AssignmentDisplay> = sqlx::query_as(
        r"
        SELECT ma.id, ma.student_id, pr.username AS student_username, ma.time_slot,
               ma.assigned_by, ma.created_at
        FROM moderator_assignments ma
        JOIN profiles pr ON pr.id = ma.student_id
        ",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list moderator assignments")?;

    assignments.sort_by_key(|a| {
        TimeSlot::ALL
            .iter()
            .position(|slot| slot.as_str() == a.time_slot)
            .unwrap_or(usize::MAX)
    });
    Ok(assignments)
}

/// The slot a user moderates, if any. Only students can be moderators.
pub async fn get_moderator_slot(pool: &SqlitePool, user_id: i64) -> Result<Option<String>> {
    let slots: Vec<String> = sqlx::query_scalar(
        r"
        SELECT ma.time_slot
        FROM moderator_assignments ma
        JOIN profiles pr ON pr.id = ma.student_id
        WHERE ma.student_id = ? AND pr.role = 'student'
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to fetch moderator slot")?;

    // Earliest slot of the day when a student holds several.
    Ok(TimeSlot::ALL
        .iter()
        .map(TimeSlot::as_str)
        .find(|slot| slots.iter().any(|s| s == slot))
        .map(str::to_string))
}

// ========== Courses & Subjects ==========

pub async fn list_courses(pool: &SqlitePool) -> Result<Vec<Course>> {
    sqlx::query_as("SELECT * FROM courses ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list courses")
}

pub async fn create_course(pool: &SqlitePool, name: &str) -> Result<Course> {
    let result = sqlx::query("INSERT INTO courses (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now_timestamp())
        .execute(pool)
        .await
        .context("Failed to insert course")?;

    sqlx::query_as("SELECT * FROM courses WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
        .context("Failed to read course")
}

/// Delete a course and its subjects. Returns whether the course existed.
pub async fn delete_course(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM subjects WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete course subjects")?;

    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete course")?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Subjects, optionally restricted to one course, ordered by name.
pub async fn list_subjects(pool: &SqlitePool, course_id: Option<i64>) -> Result<Vec<Subject>> {
    match course_id {
        Some(course_id) => sqlx::query_as("SELECT * FROM subjects WHERE course_id = ? ORDER BY name")
            .bind(course_id)
            .fetch_all(pool)
            .await,
        None => sqlx::query_as("SELECT * FROM subjects ORDER BY name")
            .fetch_all(pool)
            .await,
    }
    .context("Failed to list subjects")
}

pub async fn create_subject(
    pool: &SqlitePool,
    course_id: i64,
    semester: &str,
    name: &str,
) -> Result<Subject> {
    let result = sqlx::query(
        "INSERT INTO subjects (course_id, semester, name, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(course_id)
    .bind(semester)
    .bind(name)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to insert subject")?;

    sqlx::query_as("SELECT * FROM subjects WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
        .context("Failed to read subject")
}

pub async fn delete_subject(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete subject")?;
    Ok(result.rows_affected() > 0)
}

/// Admin-managed subject names for a course (by name) and semester.
pub async fn subject_names_for(pool: &SqlitePool, course: &str, semester: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r"
        SELECT s.name
        FROM subjects s
        JOIN courses c ON c.id = s.course_id
        WHERE c.name = ? AND s.semester = ?
        ORDER BY s.name
        ",
    )
    .bind(course)
    .bind(semester)
    .fetch_all(pool)
    .await
    .context("Failed to fetch subject names")?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("DBMS"), "DBMS");
    }
}
