use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered account, as stored in the `users` table.
///
/// Every nullable column is an `Option` here, so rows decode in one place and
/// nothing downstream has to reason about SQL NULLs.
///
/// `password` holds the argon2 PHC string and is never serialized.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub referral_code: String,
    pub invited_by: Option<i64>,
    pub points: i64,
    pub registration_src: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub job_title: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// A 5-digit one-time code proving ownership of `email`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct EmailVerificationCode {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Full chapter record, returned by the detail endpoint.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Chapter {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub content: String,
    pub icon: String,
    pub pages: i64,
    pub read_time: i64,
    pub featured: bool,
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Chapter without its body, for listings.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ChapterSummary {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
    pub pages: i64,
    pub read_time: i64,
    pub featured: bool,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Resource {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub file_size: i64,
    pub pages: i64,
    pub duration: i64,
    pub icon: String,
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct PdfResource {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub file_size: i64,
    pub pages: i64,
    pub icon: String,
    pub summary: Option<String>,
}

/// Discussion thread row. `score` and `comment_count` are denormalized and
/// maintained by the vote and comment write paths.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Thread {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub score: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub thread_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub score: i64,
    pub depth: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// What a vote or reaction points at. Exactly one of the two foreign keys is
/// set on the stored row; this enum is how the rest of the code says which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Thread(i64),
    Comment(i64),
}

impl Target {
    pub fn id(&self) -> i64 {
        match self {
            Target::Thread(id) | Target::Comment(id) => *id,
        }
    }

    /// Foreign-key column on `votes` and `reactions`.
    pub fn column(&self) -> &'static str {
        match self {
            Target::Thread(_) => "thread_id",
            Target::Comment(_) => "comment_id",
        }
    }

    /// Table holding the target itself.
    pub fn table(&self) -> &'static str {
        match self {
            Target::Thread(_) => "threads",
            Target::Comment(_) => "comments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn value(self) -> i64 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteType::Up),
            -1 => Ok(VoteType::Down),
            other => Err(format!("vote_type must be 1 or -1, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    Heart,
    Clap,
    ThumbsUp,
    ThumbsDown,
}

impl ReactionType {
    pub fn to_str(&self) -> &'static str {
        match self {
            ReactionType::Heart => "heart",
            ReactionType::Clap => "clap",
            ReactionType::ThumbsUp => "thumbs_up",
            ReactionType::ThumbsDown => "thumbs_down",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heart" => Ok(ReactionType::Heart),
            "clap" => Ok(ReactionType::Clap),
            "thumbs_up" => Ok(ReactionType::ThumbsUp),
            "thumbs_down" => Ok(ReactionType::ThumbsDown),
            other => Err(format!(
                "reaction_type must be one of heart, clap, thumbs_up, thumbs_down, got {}",
                other
            )),
        }
    }
}

/// Listing order for threads. Unknown keys fall back to `Pinned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSort {
    Newest,
    Oldest,
    Score,
    Comments,
    Pinned,
}

impl ThreadSort {
    pub fn from_param(sort: Option<&str>) -> Self {
        match sort {
            Some("newest") => ThreadSort::Newest,
            Some("oldest") => ThreadSort::Oldest,
            Some("score") => ThreadSort::Score,
            Some("comments") => ThreadSort::Comments,
            _ => ThreadSort::Pinned,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            ThreadSort::Newest => "t.created_at DESC, t.id DESC",
            ThreadSort::Oldest => "t.created_at ASC, t.id ASC",
            ThreadSort::Score => "t.score DESC, t.created_at DESC, t.id DESC",
            ThreadSort::Comments => "t.comment_count DESC, t.created_at DESC, t.id DESC",
            ThreadSort::Pinned => "t.is_pinned DESC, t.created_at DESC, t.id DESC",
        }
    }
}

/// Result of a vote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    Removed,
}

/// Result of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Added,
    Removed,
}
