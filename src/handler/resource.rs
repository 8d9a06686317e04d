use crate::{
    AppState,
    db::ResourceExt,
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

pub fn resource_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_resources))
        .route("/pdfs", get(get_pdf_resources))
        .route("/{id}", get(get_resource))
}

fn db_error(context: &str, e: sqlx::Error) -> HttpError {
    tracing::error!("DB error, {}: {}", context, e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

#[instrument(skip(app_state))]
pub async fn get_resources(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let resources = app_state
        .db()?
        .get_resources()
        .await
        .map_err(|e| db_error("getting resources", e))?;

    Ok(Json(ListResponseDto::new(resources)))
}

#[instrument(skip(app_state))]
pub async fn get_pdf_resources(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let pdfs = app_state
        .db()?
        .get_pdf_resources()
        .await
        .map_err(|e| db_error("getting pdf resources", e))?;

    Ok(Json(ListResponseDto::new(pdfs)))
}

#[instrument(skip(app_state))]
pub async fn get_resource(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let resource = app_state
        .db()?
        .get_resource(id)
        .await
        .map_err(|e| db_error("getting resource", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ResourceNotFound.to_string()))?;

    Ok(Json(DataResponseDto::new(resource)))
}
