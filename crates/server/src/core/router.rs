//! Core Router
//!
//! Shared infrastructure routes: auth and liveness.

use crate::core::auth::handlers as auth_handlers;
use crate::core::AppState;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

/// Routes reachable without a session
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth_handlers::signup))
        .route("/auth/login", post(auth_handlers::login))
        .route("/health", get(health))
}

/// Routes that need the auth middleware in front of them
pub fn protected() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/profile", put(auth_handlers::update_profile))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
