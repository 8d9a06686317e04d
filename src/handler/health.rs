use crate::{AppState, dtos::HealthResponseDto};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Always reachable, even without a store. Reports 503 when the store is
/// missing or does not answer.
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let database_ok = match &app_state.db_client {
        Some(db) => match db.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Health check ping failed: {}", e);
                false
            }
        },
        None => false,
    };

    if database_ok {
        (
            StatusCode::OK,
            Json(HealthResponseDto {
                status: "ok".to_string(),
                message: "Service is healthy".to_string(),
                database: "connected".to_string(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponseDto {
                status: "degraded".to_string(),
                message: "Database service unavailable".to_string(),
                database: "disconnected".to_string(),
            }),
        )
    }
}
