//! Cynefin Messaging Server Library
//!
//! User directory, one-to-one and group chat with live message feeds,
//! session-scoped settings, and the browser pages on top of them.

pub mod chat;
pub mod core;
pub mod pages;

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::auth::middleware::mw_require_auth;
use crate::core::{AppState, CynefinConfig};

/// Build the full application router over `state`.
pub fn app(state: AppState) -> Router {
    let protected = crate::core::router::protected()
        .merge(crate::chat::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_auth,
        ));

    Router::new()
        .merge(crate::core::router())
        .merge(protected)
        .merge(crate::pages::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cynefin_server=info,tower_http=info"));

    // Already set by an embedding binary or test harness
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("=== Cynefin Server ===");

    let config = CynefinConfig::default();
    info!("Data directory: {:?}", config.data_dir);
    info!("Database: {:?}", config.db_path());

    let bind_addr = config.bind_addr.clone();
    let state = AppState::open(config).await?;

    let auth = state.auth.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            sweep.tick().await;
            if let Err(e) = auth.prune_expired().await {
                warn!("Session sweep failed: {}", e);
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
