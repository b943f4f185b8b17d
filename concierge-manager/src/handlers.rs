use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Html,
    Form, Json,
};
use concierge_agent::{ChatReply, HealthStatus, ResetAck};
use concierge_core::session::DEFAULT_SESSION_ID;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetParams {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Answer a guest message for a session
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let reply = state
        .gateway
        .send_message(request.message, request.session_id)
        .await?;
    Ok(Json(reply))
}

/// `session_id` may come from the query string or an urlencoded form body;
/// the query string wins.
pub async fn reset_handler(
    State(state): State<AppState>,
    Query(query): Query<ResetParams>,
    form: Result<Form<ResetParams>, axum::extract::rejection::FormRejection>,
) -> Result<Json<ResetAck>, ApiError> {
    let session_id = query
        .session_id
        .or_else(|| form.ok().and_then(|Form(params)| params.session_id))
        .unwrap_or_else(default_session_id);

    let ack = state.gateway.reset_session(session_id).await?;
    Ok(Json(ack))
}

/// Liveness check
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.gateway.health())
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
