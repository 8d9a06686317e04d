use crate::{
    AppState,
    dtos::{FilterUserDto, UserResponseDto},
    error::HttpError,
    middleware::JWTAuthMiddleware,
};
use axum::{Extension, Json, Router, response::IntoResponse, routing::get};
use tracing::instrument;

/// Router for the signed-in user. The auth middleware is applied in routes.rs.
pub fn users_handler() -> Router<AppState> {
    Router::new().route("/", get(get_me))
}

#[instrument(skip(user), fields(user_id = user.user.id))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&user.user),
    }))
}
