use crate::chat::{conversations, messages};
use crate::core::models::Message;
use crate::core::{AppState, Ctx, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub content: String,
}

/// GET /api/conversations/{id}/messages
pub async fn get_history(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>> {
    let conversation = conversations::get_for_member(&state.db, ctx.user_id(), &id).await?;
    let history = messages::history(&state.db, &conversation.id).await?;
    Ok(Json(history))
}

/// POST /api/conversations/{id}/messages
///
/// Blank content is accepted and ignored with `204 No Content`.
pub async fn post_message(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
    Json(req): Json<SendRequest>,
) -> Result<Response> {
    info!("POST /api/conversations/{}/messages - {}", id, ctx.user_id());

    let conversation = conversations::get_for_member(&state.db, ctx.user_id(), &id).await?;
    match messages::send(&state.db, &state.feed, &conversation, ctx.user_id(), &req.content).await? {
        Some(message) => Ok((StatusCode::CREATED, Json(message)).into_response()),
        None => {
            debug!("Blank message to {} ignored", id);
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}
