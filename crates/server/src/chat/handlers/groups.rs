use crate::chat::groups::{self, NewGroup};
use crate::core::models::{Group, GroupDetail};
use crate::core::{AppState, Ctx, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

/// GET /api/groups
pub async fn list_groups(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Vec<Group>>> {
    let list = groups::list_groups_for_user(&state.db, ctx.user_id()).await?;
    Ok(Json(list))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<NewGroup>,
) -> Result<(StatusCode, Json<GroupDetail>)> {
    info!("POST /api/groups - {} '{}'", ctx.user_id(), req.name);
    let detail = groups::create_group(&state.db, ctx.user_id(), req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<GroupDetail>> {
    let detail = groups::get_group(&state.db, ctx.user_id(), &id).await?;
    Ok(Json(detail))
}
