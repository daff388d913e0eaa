//! Browser pages
//!
//! Server-rendered views for the four application routes plus the form
//! posts behind them. Any other path falls through to the not-found view.

pub mod handlers;
pub mod views;

use crate::core::AppState;
use axum::{
    routing::{get, post},
    Router,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Discover,
    Chats,
    Settings,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Home, Route::Discover, Route::Chats, Route::Settings];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Discover => "/discover",
            Route::Chats => "/chats",
            Route::Settings => "/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.path() == path)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(Route::Home.path(), get(handlers::home))
        .route(Route::Discover.path(), get(handlers::discover))
        .route(Route::Chats.path(), get(handlers::chats))
        .route(Route::Settings.path(), get(handlers::settings))
        .route("/chats/messages", post(handlers::post_message))
        .route("/settings/theme", post(handlers::set_theme))
        .route("/session/login", post(handlers::login))
        .route("/session/signup", post(handlers::signup))
        .route("/session/logout", post(handlers::logout))
        .fallback(handlers::not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/nowhere"), None);
    }
}
