use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body returned for every failed request.
///
/// ```json
/// { "status": "fail", "message": "Invalid email or password" }
/// ```
///
/// Kept apart from `HttpError` so that what the client sees never grows
/// internal fields by accident.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Canonical user-facing error texts.
///
/// Handlers pick a variant instead of typing the message inline, so the same
/// failure always reads the same way on the wire.
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    // Password validation
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,

    // Authentication
    InvalidToken,
    TokenNotProvided,
    WrongCredentials,
    EmailNotVerified,
    AccountInactive,

    // Registration and verification
    EmailExist,
    InvalidCodeFormat,
    InvalidOrExpiredCode,
    EmailAlreadyVerified,
    UserNotFound,

    // Authorization
    PermissionDenied,
    InvalidParentComment,
    InvalidVoteType,
    InvalidReactionType,
    SelfVote,
    SelfReact,
    ThreadLocked,

    // Lookups
    ThreadNotFound,
    CommentNotFound,
    ChapterNotFound,
    ResourceNotFound,

    UserNoLongerExist,
    DatabaseUnavailable,
    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidToken => "Token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::WrongCredentials => "Invalid email or password".to_string(),
            ErrorMessage::EmailNotVerified => {
                "Email not verified. Please verify your email first.".to_string()
            }
            ErrorMessage::AccountInactive => {
                "Account is not active. Please contact support.".to_string()
            }
            ErrorMessage::EmailExist => "User with this email already exists".to_string(),
            ErrorMessage::InvalidCodeFormat => {
                "Verification code must be exactly 5 digits".to_string()
            }
            ErrorMessage::InvalidOrExpiredCode => {
                "Invalid or expired verification code".to_string()
            }
            ErrorMessage::EmailAlreadyVerified => "Email is already verified".to_string(),
            ErrorMessage::UserNotFound => "User not found".to_string(),
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::InvalidParentComment => {
                "Parent comment not found in this thread".to_string()
            }
            ErrorMessage::InvalidVoteType => "vote_type must be 1 or -1".to_string(),
            ErrorMessage::InvalidReactionType => {
                "reaction_type must be one of heart, clap, thumbs_up, thumbs_down".to_string()
            }
            ErrorMessage::SelfVote => "You cannot vote on your own post".to_string(),
            ErrorMessage::SelfReact => "You cannot react to your own post".to_string(),
            ErrorMessage::ThreadLocked => "This thread is locked".to_string(),
            ErrorMessage::ThreadNotFound => "Thread not found".to_string(),
            ErrorMessage::CommentNotFound => "Comment not found".to_string(),
            ErrorMessage::ChapterNotFound => "Chapter not found".to_string(),
            ErrorMessage::ResourceNotFound => "Resource not found".to_string(),
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::DatabaseUnavailable => "Database service unavailable".to_string(),
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
        };
        write!(f, "{}", message)
    }
}

/// Error type returned by handlers and middleware.
///
/// Bundles the client message with its status code; axum turns it into a
/// response through `IntoResponse`.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
        }
    }

    /// 500, for persistence and delivery failures.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// 400, for malformed input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    /// 409, for duplicate resources such as an existing email.
    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::CONFLICT)
    }

    /// 401. Means "unauthenticated" despite the name.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::UNAUTHORIZED)
    }

    /// 403, for ownership failures and self-votes.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    /// 503, returned while the store is unreachable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::SERVICE_UNAVAILABLE)
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message,
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Unreadable or mistyped JSON bodies are plain bad requests.
impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected JSON body: {}", rejection.body_text());
        HttpError::bad_request(rejection.body_text())
    }
}
