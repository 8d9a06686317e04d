use crate::{
    AppState,
    db::ChapterExt,
    dtos::{DataResponseDto, ListResponseDto},
    error::{ErrorMessage, HttpError},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

pub fn chapter_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_chapters))
        .route("/{key}", get(get_chapter))
}

#[instrument(skip(app_state))]
pub async fn get_chapters(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let chapters = app_state.db()?.get_chapters().await.map_err(|e| {
        tracing::error!("DB error, getting chapters: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(ListResponseDto::new(chapters)))
}

/// A numeric key is an id, anything else a slug. Any `locale` query
/// parameter is accepted and ignored.
#[instrument(skip(app_state))]
pub async fn get_chapter(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let db = app_state.db()?;

    let result = match key.parse::<i64>() {
        Ok(id) => db.get_chapter_by_id(id).await,
        Err(_) => db.get_chapter_by_slug(&key).await,
    };

    let chapter = result
        .map_err(|e| {
            tracing::error!("DB error, getting chapter {}: {}", key, e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ChapterNotFound.to_string()))?;

    Ok(Json(DataResponseDto::new(chapter)))
}
