use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Value, json};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Health check handler
/// Returns a simple JSON response with the number of calls in progress
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "active_sessions": state.sessions.len()
    }))
}

/// Inbound call webhook
///
/// Answers the call with TwiML that connects its audio to the media stream endpoint.
/// The stream host is the configured public host, falling back to the request's Host.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let host = match &state.config.public_host {
        Some(host) => host.clone(),
        None => headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::BadRequest("No public host configured and no Host header".to_string())
            })?,
    };

    info!("Answering inbound call, streaming to {}", host);
    Ok((
        [(header::CONTENT_TYPE, "application/xml")],
        stream_twiml(&host),
    )
        .into_response())
}

pub fn stream_twiml(host: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><Stream url="wss://{host}/connection" /></Connect></Response>"#
    )
}
