//! Auth handlers

use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::models::Profile;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub full_name: String,
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    info!("POST /auth/signup - {}", req.email);

    let profile = state
        .auth
        .signup(&req.email, &req.full_name, &req.password)
        .await
        .inspect_err(|e| warn!("Signup failed for {}: {}", req.email, e))?;

    let (_, session) = state.auth.login(&profile.email, &req.password).await?;

    info!("User {} registered successfully", profile.email);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            user_id: profile.id,
            full_name: profile.full_name,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /auth/login - {}", req.email);

    let (profile, session) = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        token: session.token,
        user_id: profile.id,
        full_name: profile.full_name,
    }))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, ctx: Ctx) -> Result<StatusCode> {
    info!("POST /auth/logout - {}", ctx.user_id());
    state.auth.logout(ctx.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    info!("PUT /auth/profile - {}", ctx.user_id());

    let profile = state
        .auth
        .update_metadata(ctx.user_id(), req.full_name, req.avatar_url)
        .await?;

    Ok(Json(profile))
}
