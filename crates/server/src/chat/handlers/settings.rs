//! Account settings and the session theme

use crate::core::models::Theme;
use crate::core::{AppState, Ctx, Result};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub email: String,
    pub theme: Theme,
    pub is_dark: bool,
}

#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>, ctx: Ctx) -> Result<Json<SettingsView>> {
    let profile = state.auth.get_profile(ctx.user_id()).await?;
    let theme = state.auth.session_theme(ctx.token()).await?;

    Ok(Json(SettingsView {
        email: profile.email,
        theme,
        is_dark: theme.is_dark(),
    }))
}

/// PUT /api/settings/theme
pub async fn set_theme(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<ThemeRequest>,
) -> Result<Json<SettingsView>> {
    info!("PUT /api/settings/theme - {}", req.theme.as_str());
    let theme = state.auth.set_theme(ctx.token(), req.theme).await?;
    let profile = state.auth.get_profile(ctx.user_id()).await?;

    Ok(Json(SettingsView {
        email: profile.email,
        theme,
        is_dark: theme.is_dark(),
    }))
}
