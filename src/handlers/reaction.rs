use super::{guard_method, parse_body, request_meta};
use crate::config::is_development;
use crate::error::{json_response, ApiError};
use crate::state::{reaction::trim_reaction, AppState, ReactionRecord};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    response::Response,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Save-reaction response. The reaction text itself is never echoed back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    success: bool,
    message: &'static str,
    id: String,
    saved_at: String,
}

impl ReactionResponse {
    pub fn saved(record: &ReactionRecord) -> Self {
        Self {
            success: true,
            message: "Reaction saved successfully",
            id: record.id.clone(),
            saved_at: record.saved_at.clone(),
        }
    }
}

/// Handler for /api/save-reaction
pub async fn save_reaction_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    if let Some(response) = guard_method(&method) {
        return Ok(response);
    }

    let data = parse_body(body).map_err(|e| {
        tracing::error!("error saving reaction: {}", e);
        let details = is_development(state.config.as_ref()).then(|| e.to_string());
        e.into_api_error("Failed to save reaction. Please try again.", details)
    })?;

    let text = match data.get("reaction") {
        Some(Value::String(s)) if !s.is_empty() => trim_reaction(s),
        _ => {
            return Err(ApiError::BadRequest(
                "Valid reaction text is required".to_string(),
            ))
        }
    };
    if text.is_empty() {
        return Err(ApiError::BadRequest("Reaction cannot be empty".to_string()));
    }

    let timestamp = match data.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };

    let record = ReactionRecord::new(text, timestamp, request_meta(&headers));
    let response = ReactionResponse::saved(&record);
    state.reactions.insert(record);

    Ok(json_response(StatusCode::OK, &response))
}
