//! Chat Handlers and Router
//!
//! Directory, conversations, messages, live subscriptions, groups and
//! settings. Every route here sits behind the auth middleware.

use crate::core::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub mod conversations;
pub mod directory;
pub mod groups;
pub mod messages;
pub mod settings;
pub mod subscribe;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(directory::list_users))
        .route("/api/chats", get(directory::all_chats))
        .route("/api/chats/recent", get(directory::recent_chats))
        .route("/api/conversations", get(conversations::list_conversations))
        .route(
            "/api/conversations/direct",
            post(conversations::resolve_direct),
        )
        .route(
            "/api/conversations/group",
            post(conversations::resolve_group),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(messages::get_history).post(messages::post_message),
        )
        .route(
            "/api/conversations/{id}/subscribe",
            get(subscribe::subscribe),
        )
        .route(
            "/api/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route("/api/groups/{id}", get(groups::get_group))
        .route("/api/settings", get(settings::get_settings))
        .route("/api/settings/theme", put(settings::set_theme))
}
