//! Core Service Layer
//!
//! Shared infrastructure for the Cynefin server: authentication, the
//! relational store, the change feed, data models and configuration.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod router;

pub use config::{AppState, CynefinConfig};
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;
