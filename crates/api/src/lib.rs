//! HTTP layer for the DevOps configuration generators

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, serve, AppState};
pub use config::{ApiConfig, LogFormat};
pub use error::ApiError;
