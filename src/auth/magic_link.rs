//! Passwordless sign-in with one-time links.
//!
//! Only the SHA-256 hash of a token is stored. A link carries the role chosen
//! on the login form plus an optional course and semester, which are applied
//! to the profile when the link is redeemed.

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::info;

use super::mail::MagicLinkSender;
use super::session::generate_session_token;
use super::username::generate_unique_username;
use crate::config::Config;
use crate::db::{self, format_timestamp, NewMagicLink, NewProfile, Profile, Role};

/// A sign-in request from the login form.
#[derive(Debug, Clone)]
pub struct MagicLinkRequest {
    pub email: String,
    pub role: Role,
    pub course: Option<String>,
    pub semester: Option<String>,
}

/// Result of redeeming a link.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub profile: Profile,
    pub session_token: String,
    /// True when the profile was created by this sign-in.
    pub created: bool,
}

/// Trim and lowercase an email address, rejecting obviously invalid ones.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    valid.then_some(email)
}

fn generate_magic_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 of a token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// The role a sign-in ends up with.
///
/// Configured admin emails are always admins and an existing profile keeps
/// its role; otherwise the requested role is used.
#[must_use]
pub fn resolve_role(existing: Option<&Profile>, requested: Role, is_admin_email: bool) -> Role {
    if is_admin_email {
        return Role::Admin;
    }
    existing
        .and_then(Profile::role_enum)
        .unwrap_or(requested)
}

fn expiry_after(ttl: std::time::Duration) -> Result<String> {
    let ttl = chrono::Duration::from_std(ttl).context("Token lifetime out of range")?;
    Ok(format_timestamp(Utc::now() + ttl))
}

/// Store a new link and hand it to the sender. Returns the role it grants.
///
/// # Errors
///
/// Returns an error if the link cannot be stored or delivered.
pub async fn issue_magic_link(
    pool: &SqlitePool,
    config: &Config,
    sender: &dyn MagicLinkSender,
    request: &MagicLinkRequest,
) -> Result<Role> {
    let existing = db::get_profile_by_email(pool, &request.email).await?;
    let role = resolve_role(
        existing.as_ref(),
        request.role,
        config.is_admin_email(&request.email),
    );

    let token = generate_magic_token();
    db::create_magic_link(
        pool,
        &NewMagicLink {
            token_hash: hash_token(&token),
            email: request.email.clone(),
            role,
            course: request.course.clone(),
            semester: request.semester.clone(),
            expires_at: expiry_after(config.magic_link_ttl)?,
        },
    )
    .await?;

    let link = format!(
        "{}/auth/callback?token={token}",
        config.public_url.trim_end_matches('/')
    );
    sender
        .send(&request.email, &link)
        .await
        .context("Failed to deliver magic link")?;

    info!(email = %request.email, role = role.as_str(), "Issued magic link");
    Ok(role)
}

/// Consume a link and open a session.
///
/// Returns `None` if the token is unknown, expired or already used.
///
/// # Errors
///
/// Returns an error on database failures.
pub async fn redeem_magic_link(
    pool: &SqlitePool,
    config: &Config,
    token: &str,
) -> Result<Option<SignIn>> {
    let Some(link) = db::consume_magic_link(pool, &hash_token(token)).await? else {
        return Ok(None);
    };

    let (mut profile, created) = if let Some(profile) = db::get_profile_by_email(pool, &link.email).await? {
        (profile, false)
    } else {
        let role = Role::from_str(&link.role).context("Magic link carries an unknown role")?;
        let username = generate_unique_username(pool, &link.email).await?;
        let id = db::create_profile(
            pool,
            &NewProfile {
                email: link.email.clone(),
                username,
                role,
                course: None,
                semester: None,
            },
        )
        .await?;
        let profile = db::get_profile_by_id(pool, id)
            .await?
            .context("Profile vanished after insert")?;
        info!(user_id = id, username = %profile.username, role = role.as_str(), "Created profile");
        (profile, true)
    };

    if link.course.is_some() || link.semester.is_some() {
        let course = link.course.or(profile.course.take());
        let semester = link.semester.or(profile.semester.take());
        db::update_profile_academics(pool, profile.id, course.as_deref(), semester.as_deref())
            .await?;
        profile.course = course;
        profile.semester = semester;
    }

    let session_token = generate_session_token();
    db::create_session(
        pool,
        profile.id,
        &session_token,
        &expiry_after(config.session_ttl)?,
    )
    .await?;

    Ok(Some(SignIn {
        profile,
        session_token,
        created,
    }))
}

/// Landing page for a role after sign-in.
#[must_use]
pub const fn home_path(role: Role) -> &'static str {
    match role {
        Role::Teacher => "/teacher",
        Role::Student => "/student",
        Role::Admin => "/home",
    }
}
