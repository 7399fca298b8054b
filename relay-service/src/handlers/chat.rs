use crate::models::{ChatRequest, ChatResponse};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed chat body");
        AppError::BadRequest(rejection.body_text())
    })?;

    let response = state.relay.handle(request).await.map_err(|e| {
        tracing::warn!(error = %e, "Chat relay failed");
        AppError::from(e)
    })?;

    Ok(Json(response))
}
