//! Docket Server - REST API for Docket synchronization
//!
//! This crate provides an HTTP API over the sync engine:
//!
//! - **Sync**: start a background sync and poll its progress
//! - **Matters**: aggregate statistics and single matters with status classification
//! - **Health**: server and database status
//!
//! # API Documentation
//!
//! When running the server, interactive API documentation is available
//! at `/swagger-ui`.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
