//! Chat Service Layer
//!
//! Conversations, messages, live feeds, the user directory and groups.

pub mod conversations;
pub mod directory;
pub mod feed;
pub mod groups;
pub mod handlers;
pub mod messages;
pub mod selection;

pub use handlers::router;
