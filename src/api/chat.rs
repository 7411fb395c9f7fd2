use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::error::RestError;
use crate::ax_state::AppState;
use crate::models::context::{ChatAnswer, ChatRequest};

pub async fn chat_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatAnswer>, RestError> {
    let Json(payload) = payload?;
    if payload.question.trim().is_empty() {
        return Err(RestError::bad_request("question must not be empty"));
    }

    let request_id = Uuid::new_v4();
    info!("收到提问 request_id={} mode={:?}", request_id, payload.mode);

    let answer = state.router.answer_with_id(request_id, &payload).await;
    info!(
        "应答完成 request_id={} backend={:?} notices={}",
        request_id,
        answer.backend,
        answer.notices.len()
    );
    Ok(Json(answer))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
