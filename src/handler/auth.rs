use crate::{
    AppState,
    db::{DBClient, UserExt},
    dtos::{
        AuthResponseDto, FilterUserDto, JsonBody, LoginUserDto, RegisterResponseDto,
        RegisterUserDto, ResendCodeDto, Response, VerifyEmailDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_verification_code, send_welcome_email},
    models::User,
    utils::{password, verification},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use tracing::instrument;
use validator::Validate;

const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Router for authentication endpoints
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/resend-code", post(resend_code))
        .route("/login", post(login))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn db_error(context: &str, e: sqlx::Error) -> HttpError {
    tracing::error!("DB error, {}: {}", context, e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

/// Register a new, inactive account and mail it a verification code
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    JsonBody(body): JsonBody<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;
    let email = normalize_email(&body.email);

    let existing = db
        .get_user(None, Some(&email))
        .await
        .map_err(|e| db_error("checking email", e))?;
    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            ErrorMessage::EmailExist.to_string(),
        ));
    }

    let hash_password = password::hash(&body.password).map_err(|e| match e {
        ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
            HttpError::bad_request(e.to_string())
        }
        _ => {
            tracing::error!("Password hashing error: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        }
    })?;

    let referral_code = unused_referral_code(db).await?;
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let user = match db
        .save_user(&email, &hash_password, name, &referral_code)
        .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::warn!("Email registered concurrently: {}", db_err);
            return Err(HttpError::unique_constraint_violation(
                ErrorMessage::EmailExist.to_string(),
            ));
        }
        Err(e) => return Err(db_error("saving user", e)),
    };

    // The account stays in place if the code cannot be stored or sent; the
    // user can ask for a new code through resend.
    issue_verification_code(&app_state, db, &user).await?;

    tracing::info!(user_id = user.id, "Register Successful");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponseDto {
            status: "success".to_string(),
            message: "Registration successful. Please check your email for the verification code."
                .to_string(),
            user_id: user.id,
        }),
    ))
}

/// Confirm an email address with a 5-digit code and sign the user in
#[instrument(skip(app_state, jar, body), fields(email = %body.email))]
pub async fn verify_email(
    State(app_state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<VerifyEmailDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid verify input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let code = verification::normalize_code(&body.code)
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::InvalidCodeFormat.to_string()))?;

    let db = app_state.db()?;
    let email = normalize_email(&body.email);

    let record = db
        .find_verification_code(&email, &code)
        .await
        .map_err(|e| db_error("finding verification code", e))?
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::InvalidOrExpiredCode.to_string()))?;

    if record.is_expired(Utc::now()) {
        return Err(HttpError::bad_request(
            ErrorMessage::InvalidOrExpiredCode.to_string(),
        ));
    }

    let user = db
        .complete_verification(record.user_id, record.id)
        .await
        .map_err(|e| db_error("completing verification", e))?
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::InvalidOrExpiredCode.to_string()))?;

    let token = create_token(&app_state, user.id)?;

    let mailer = app_state.mailer.clone();
    let welcome_user = user.clone();
    tokio::spawn(async move {
        if let Err(e) = send_welcome_email(
            &mailer,
            &welcome_user.email,
            welcome_user.name.as_deref(),
            &welcome_user.referral_code,
        )
        .await
        {
            tracing::warn!("Failed to send welcome email to {}: {}", welcome_user.email, e);
        }
    });

    tracing::info!(user_id = user.id, "Email verified");
    Ok((
        jar.add(access_cookie(&app_state, token.clone())),
        Json(AuthResponseDto {
            status: "success".to_string(),
            token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Send a fresh verification code to an unverified account
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn resend_code(
    State(app_state): State<AppState>,
    JsonBody(body): JsonBody<ResendCodeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid resend input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;
    let email = normalize_email(&body.email);

    let user = db
        .get_user(None, Some(&email))
        .await
        .map_err(|e| db_error("getting user", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::UserNotFound.to_string()))?;

    if user.is_verified() {
        return Err(HttpError::bad_request(
            ErrorMessage::EmailAlreadyVerified.to_string(),
        ));
    }

    issue_verification_code(&app_state, db, &user).await?;

    Ok(Json(Response {
        status: "success",
        message: "Verification code sent".to_string(),
    }))
}

/// Sign in a verified, active user
#[instrument(skip(app_state, jar, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::warn!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let db = app_state.db()?;
    let email = normalize_email(&body.email);

    let user = db
        .get_user(None, Some(&email))
        .await
        .map_err(|e| db_error("getting user", e))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| match e {
        ErrorMessage::InvalidHashFormat | ErrorMessage::HashingError => {
            tracing::error!("Stored password hash for user {} is unusable: {}", user.id, e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        }
        _ => HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()),
    })?;

    if !password_matched {
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    if !user.is_verified() {
        return Err(HttpError::forbidden(
            ErrorMessage::EmailNotVerified.to_string(),
        ));
    }
    if !user.is_active {
        return Err(HttpError::forbidden(
            ErrorMessage::AccountInactive.to_string(),
        ));
    }

    let token = create_token(&app_state, user.id)?;

    tracing::info!(user_id = user.id, "Login Successful");
    Ok((
        jar.add(access_cookie(&app_state, token.clone())),
        Json(AuthResponseDto {
            status: "success".to_string(),
            token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Generates, stores and mails a new code for `user`.
async fn issue_verification_code(
    app_state: &AppState,
    db: &DBClient,
    user: &User,
) -> Result<(), HttpError> {
    let code = verification::generate_code();
    let expires_at = Utc::now() + verification::code_ttl();

    db.save_verification_code(user.id, &user.email, &code, expires_at)
        .await
        .map_err(|e| db_error("saving verification code", e))?;

    send_verification_code(&app_state.mailer, &user.email, user.name.as_deref(), &code)
        .await
        .map_err(|e| {
            tracing::error!("Failed to send verification email to {}: {}", user.email, e);
            HttpError::server_error("Failed to send verification email")
        })
}

async fn unused_referral_code(db: &DBClient) -> Result<String, HttpError> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let candidate = verification::generate_referral_code();
        let taken = db
            .referral_code_exists(&candidate)
            .await
            .map_err(|e| db_error("checking referral code", e))?;
        if !taken {
            return Ok(candidate);
        }
    }

    tracing::error!("No free referral code after {} attempts", REFERRAL_CODE_ATTEMPTS);
    Err(HttpError::server_error(ErrorMessage::ServerError.to_string()))
}

fn create_token(app_state: &AppState, user_id: i64) -> Result<String, HttpError> {
    app_state.tokens.create_token(user_id).map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })
}

fn access_cookie(app_state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build(("access_token", token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.env.is_production())
        .build()
}
