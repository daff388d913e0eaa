use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::models::Profile;
use axum::extract::State;
use axum::Json;

/// GET /auth/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Profile>> {
    // The middleware has already validated the session behind `ctx`
    let profile = state.auth.get_profile(ctx.user_id()).await?;

    Ok(Json(profile))
}
