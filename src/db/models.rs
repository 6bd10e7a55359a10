use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A user profile. The id doubles as the auth identity.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub nickname: Option<String>,
    pub nickname_changed: bool,
    pub role: String,
    pub course: Option<String>,
    pub semester: Option<String>,
    pub created_at: String,
}

impl Profile {
    #[must_use]
    pub fn role_enum(&self) -> Option<Role> {
        Role::from_str(&self.role)
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        self.role_enum() == Some(Role::Teacher)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role_enum() == Some(Role::Student)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role_enum() == Some(Role::Admin)
    }

    /// Nickname when set, username otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// Data for inserting a new profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub username: String,
    pub role: Role,
    pub course: Option<String>,
    pub semester: Option<String>,
}

/// A login session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    pub created_at: String,
    pub last_used_at: String,
}

/// A one-time sign-in token sent by email. Only the token hash is stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MagicLink {
    pub id: i64,
    pub token_hash: String,
    pub email: String,
    pub role: String,
    /// Course chosen on the login form, applied once the profile exists
    pub course: Option<String>,
    pub semester: Option<String>,
    pub expires_at: String,
    pub consumed_at: Option<String>,
    pub created_at: String,
}

/// Data for inserting a new magic link.
#[derive(Debug, Clone)]
pub struct NewMagicLink {
    pub token_hash: String,
    pub email: String,
    pub role: Role,
    pub course: Option<String>,
    pub semester: Option<String>,
    pub expires_at: String,
}

/// A file attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Object storage key
    pub key: String,
    /// Original file name
    pub name: String,
    pub url: String,
    pub size: i64,
}

/// A discussion post as stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub preview: String,
    pub votes: i64,
    /// JSON array of [`Attachment`]
    pub attachments: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    /// Decode the attachment list. Malformed JSON yields an empty list.
    #[must_use]
    pub fn attachment_list(&self) -> Vec<Attachment> {
        decode_attachments(self.attachments.as_deref())
    }
}

pub(crate) fn decode_attachments(raw: Option<&str>) -> Vec<Attachment> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Data for inserting a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub preview: String,
    pub tags: Vec<String>,
}

/// Replacement values for an edited post.
#[derive(Debug, Clone)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
    pub preview: String,
    pub tags: Vec<String>,
    /// Keys of attachments to detach from the post
    pub remove_attachments: Vec<String>,
}

/// Post joined with author, tag names and comment count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub votes: i64,
    pub created_at: String,
    pub author_id: i64,
    pub author: String,
    pub author_role: String,
    pub comment_count: i64,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl PostSummary {
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Row shape of the post listing query, before tags are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub votes: i64,
    pub created_at: String,
    pub author_id: i64,
    pub author: Option<String>,
    pub author_role: Option<String>,
    pub comment_count: i64,
    pub attachments: Option<String>,
}

impl PostRow {
    pub(crate) fn into_summary(self, tags: Vec<String>) -> PostSummary {
        PostSummary {
            id: self.id,
            title: self.title,
            preview: self.preview,
            content: self.content,
            votes: self.votes,
            created_at: self.created_at,
            author_id: self.author_id,
            author: self.author.unwrap_or_else(|| "Unknown User".to_string()),
            author_role: self.author_role.unwrap_or_else(|| "student".to_string()),
            comment_count: self.comment_count,
            tags,
            attachments: decode_attachments(self.attachments.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
}

/// Comment joined with its author's names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentDisplay {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
    pub username: Option<String>,
    pub nickname: Option<String>,
}

impl CommentDisplay {
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// Result of toggling a vote, read back inside the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub post_id: i64,
    pub voted: bool,
    pub votes: i64,
}

/// Moderation time slots a student can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "10am-12pm")]
    Morning,
    #[serde(rename = "12pm-2pm")]
    Midday,
    #[serde(rename = "2pm-4pm")]
    Afternoon,
    #[serde(rename = "4pm-6pm")]
    LateAfternoon,
    #[serde(rename = "6pm-8pm")]
    Evening,
    #[serde(rename = "8pm-10pm")]
    Night,
    #[serde(rename = "10pm-12am")]
    LateNight,
}

impl TimeSlot {
    pub const ALL: [Self; 7] = [
        Self::Morning,
        Self::Midday,
        Self::Afternoon,
        Self::LateAfternoon,
        Self::Evening,
        Self::Night,
        Self::LateNight,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "10am-12pm",
            Self::Midday => "12pm-2pm",
            Self::Afternoon => "2pm-4pm",
            Self::LateAfternoon => "4pm-6pm",
            Self::Evening => "6pm-8pm",
            Self::Night => "8pm-10pm",
            Self::LateNight => "10pm-12am",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModeratorAssignment {
    pub id: i64,
    pub student_id: i64,
    pub time_slot: String,
    pub assigned_by: i64,
    pub created_at: String,
}

/// Assignment joined with the student's username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentDisplay {
    pub id: i64,
    pub student_id: i64,
    pub student_username: String,
    pub time_slot: String,
    pub assigned_by: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub course_id: i64,
    pub semester: String,
    pub name: String,
    pub created_at: String,
}

/// Activity counters shown on the student dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StudentStats {
    pub post_count: i64,
    pub comment_count: i64,
}

/// Format a timestamp the way every column in this schema stores it.
///
/// Second precision with a `Z` suffix keeps string order equal to time order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
