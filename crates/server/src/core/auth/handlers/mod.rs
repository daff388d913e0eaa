//! Auth Handlers

pub mod auth;
pub mod auth_me;

pub use auth::{login, logout, signup, update_profile};
pub use auth_me::me;
