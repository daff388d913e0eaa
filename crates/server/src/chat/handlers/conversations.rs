use crate::chat::conversations;
use crate::core::models::Conversation;
use crate::core::{AppState, Ctx, Result};
use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DirectRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub group_id: String,
}

/// POST /api/conversations/direct
pub async fn resolve_direct(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<DirectRequest>,
) -> Result<Json<Conversation>> {
    info!("POST /api/conversations/direct - {} -> {}", ctx.user_id(), req.user_id);
    let conversation = conversations::resolve_direct(&state.db, ctx.user_id(), &req.user_id).await?;
    Ok(Json(conversation))
}

/// POST /api/conversations/group
pub async fn resolve_group(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<GroupRequest>,
) -> Result<Json<Conversation>> {
    info!("POST /api/conversations/group - {} -> {}", ctx.user_id(), req.group_id);
    let conversation = conversations::resolve_group(&state.db, ctx.user_id(), &req.group_id).await?;
    Ok(Json(conversation))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Vec<Conversation>>> {
    let list = conversations::list_for_user(&state.db, ctx.user_id()).await?;
    Ok(Json(list))
}
