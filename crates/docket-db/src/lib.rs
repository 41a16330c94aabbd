//! Docket DB - PostgreSQL persistence for the sync engine
//!
//! This crate provides the production implementations of the storage traits
//! in [`docket_core::traits`].
//!
//! # Overview
//!
//! The main components are:
//! - [`EntityRepository`] - mirrored practice data, implements `EntityStore`
//! - [`SyncProgressRepository`] - per-actor progress records, implements `SyncRegistry`
//! - [`CredentialRepository`] - stored bearer tokens, implements `TokenProvider`
//! - [`schema`] - table definitions applied at startup

mod credential_repository;
mod entity_repository;
mod progress_repository;
pub mod schema;

pub use credential_repository::CredentialRepository;
pub use entity_repository::EntityRepository;
pub use progress_repository::SyncProgressRepository;
