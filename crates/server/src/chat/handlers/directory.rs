//! Directory and chat listing handlers

use crate::chat::directory;
use crate::core::models::{ChatSummary, Profile};
use crate::core::{AppState, Ctx, Result};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

/// GET /api/users
pub async fn list_users(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Vec<Profile>>> {
    info!("GET /api/users - {}", ctx.user_id());
    let users = directory::list_directory(&state.db, ctx.user_id()).await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /api/chats/recent?limit=
pub async fn recent_chats(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ChatSummary>>> {
    let limit = query.limit.unwrap_or(state.config.recent_limit);
    let chats = directory::recent_chats(&state.db, ctx.user_id(), limit).await?;
    Ok(Json(chats))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// GET /api/chats?search=
pub async fn all_chats(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ChatSummary>>> {
    let chats = directory::all_chats(&state.db, ctx.user_id(), query.search.as_deref()).await?;
    Ok(Json(chats))
}
