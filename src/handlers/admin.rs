use crate::state::{AppState, ReactionRecord};
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ReactionList {
    count: usize,
    reactions: Vec<ReactionRecord>,
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    cleared: bool,
    count: usize,
}

/// GET /reactions
pub async fn list_reactions_handler(State(state): State<Arc<AppState>>) -> Response {
    let reactions = state.reactions.snapshot();
    Json(ReactionList {
        count: reactions.len(),
        reactions,
    })
    .into_response()
}

/// DELETE /reactions
pub async fn clear_reactions_handler(State(state): State<Arc<AppState>>) -> Response {
    let count = state.reactions.reset();
    Json(ClearResult {
        cleared: true,
        count,
    })
    .into_response()
}
