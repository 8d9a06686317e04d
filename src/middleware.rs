use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::User,
};

/// Authenticated user, inserted into request extensions by [`auth`] and
/// [`optional_auth`].
///
/// ```ignore
/// async fn my_handler(Extension(auth): Extension<JWTAuthMiddleware>) {
///     // auth.user is the caller
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

/// Token from the `access_token` cookie, else from `Authorization: Bearer`.
fn extract_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_owned())
        })
        .filter(|token| !token.is_empty())
}

async fn resolve_user(app_state: &AppState, token: &str) -> Result<User, HttpError> {
    let user_id = app_state.tokens.decode_token(token)?;

    let user = app_state
        .db()?
        .get_user(Some(user_id), None)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load user {} for token: {:?}", user_id, e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    user.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
}

/// Rejects the request with 401 unless it carries a valid token for an
/// existing user.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, req.headers())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let user = resolve_user(&app_state, &token).await?;

    req.extensions_mut().insert(JWTAuthMiddleware { user });
    Ok(next.run(req).await)
}

/// Attaches the user when a valid token is present. Any problem with the
/// token leaves the request anonymous instead of failing it.
pub async fn optional_auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(&cookie_jar, req.headers()) {
        match resolve_user(&app_state, &token).await {
            Ok(user) => {
                req.extensions_mut().insert(JWTAuthMiddleware { user });
            }
            Err(e) => {
                tracing::debug!("Ignoring unusable token on optional route: {}", e.message);
            }
        }
    }

    next.run(req).await
}

/// Gives every OPTIONS response a 204. Wraps the CORS layer, so preflight
/// answers keep the headers it set.
pub async fn options_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_options {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
