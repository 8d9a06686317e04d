use std::collections::BTreeMap;

use crate::{
    error::HttpError,
    models::{Comment, Thread, User},
};
use axum::extract::FromRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `Json` extractor that answers with [`HttpError`] instead of axum's
/// plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HttpError))]
pub struct JsonBody<T>(pub T);

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 64,
        message = "Password must be between 6 and 64 characters"
    ))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must not be more than 100 characters"))]
    pub name: Option<String>,
}

/// The code arrives as typed by the user; separators are stripped later.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct VerifyEmailDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Verification code is required"))]
    pub code: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResendCodeDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// ============================================================================
// User Response DTOs
// ============================================================================

/// User data sent to clients. The password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub referral_code: String,
    pub points: i64,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub job_title: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            email: user.email.to_owned(),
            name: user.name.to_owned(),
            is_active: user.is_active,
            email_verified: user.is_verified(),
            email_verified_at: user.email_verified_at,
            referral_code: user.referral_code.to_owned(),
            points: user.points,
            bio: user.bio.to_owned(),
            city: user.city.to_owned(),
            job_title: user.job_title.to_owned(),
            photo_url: user.photo_url.to_owned(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponseDto {
    pub status: String,
    pub message: String,
    pub user_id: i64,
}

/// Returned by login and by a successful email verification
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub status: String,
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: FilterUserDto,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// Catalog DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ListResponseDto<T> {
    pub status: &'static str,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResponseDto<T> {
    pub fn new(data: Vec<T>) -> Self {
        ListResponseDto {
            status: "success",
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponseDto<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataResponseDto<T> {
    pub fn new(data: T) -> Self {
        DataResponseDto {
            status: "success",
            data,
        }
    }
}

// ============================================================================
// Discussion request DTOs
// ============================================================================

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ThreadListQueryDto {
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ThreadListQueryDto {
    /// Out-of-range values are replaced, never rejected.
    pub fn pagination(&self) -> (i64, i64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let per_page = self
            .per_page
            .filter(|n| (1..=MAX_PER_PAGE).contains(n))
            .unwrap_or(DEFAULT_PER_PAGE);
        (page, per_page)
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ThreadInputDto {
    #[validate(length(
        min = 3,
        max = 200,
        message = "Title must be between 3 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(min = 10, message = "Content must be at least 10 characters"))]
    pub content: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateCommentDto {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub parent_id: Option<i64>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateCommentDto {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteDto {
    pub vote_type: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactDto {
    pub reaction_type: String,
}

// ============================================================================
// Discussion response DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthorDto {
    pub id: i64,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Thread joined with its author and the viewer's own vote and reactions.
/// `user_reactions` is the raw `group_concat` of reaction types.
#[derive(Debug, sqlx::FromRow)]
pub struct ThreadRow {
    #[sqlx(flatten)]
    pub thread: Thread,
    pub author_name: Option<String>,
    pub author_photo_url: Option<String>,
    pub user_vote: Option<i64>,
    pub user_reactions: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
    pub author_photo_url: Option<String>,
    pub user_vote: Option<i64>,
    pub user_reactions: Option<String>,
}

pub type ReactionCounts = BTreeMap<String, i64>;

#[derive(Debug, Serialize)]
pub struct ThreadDto {
    #[serde(flatten)]
    pub thread: Thread,
    pub author: AuthorDto,
    pub user_vote: Option<i64>,
    pub user_reactions: Vec<String>,
    pub reaction_counts: ReactionCounts,
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: AuthorDto,
    pub user_vote: Option<i64>,
    pub user_reactions: Vec<String>,
    pub reaction_counts: ReactionCounts,
}

pub fn split_reactions(raw: Option<String>) -> Vec<String> {
    let mut reactions: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    reactions.sort();
    reactions
}

impl ThreadDto {
    pub fn from_row(row: ThreadRow, reaction_counts: ReactionCounts) -> Self {
        ThreadDto {
            author: AuthorDto {
                id: row.thread.user_id,
                name: row.author_name,
                photo_url: row.author_photo_url,
            },
            thread: row.thread,
            user_vote: row.user_vote,
            user_reactions: split_reactions(row.user_reactions),
            reaction_counts,
        }
    }
}

impl CommentDto {
    pub fn from_row(row: CommentRow, reaction_counts: ReactionCounts) -> Self {
        CommentDto {
            author: AuthorDto {
                id: row.comment.user_id,
                name: row.author_name,
                photo_url: row.author_photo_url,
            },
            comment: row.comment,
            user_vote: row.user_vote,
            user_reactions: split_reactions(row.user_reactions),
            reaction_counts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ThreadListResponseDto {
    pub status: &'static str,
    pub threads: Vec<ThreadDto>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponseDto {
    pub status: &'static str,
    pub thread: ThreadDto,
    pub comments: Vec<CommentDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponseDto {
    pub status: String,
    pub message: String,
    pub action: String,
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactResponseDto {
    pub status: String,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub message: String,
    pub database: String,
}
