//! Docket Core - Domain types, business rules and the sync engine.
//!
//! This crate provides the core functionality for Docket, including:
//!
//! - **Domain models**: [`NewMatter`], [`Matter`], [`NewUser`], [`NewContact`], etc.
//! - **Classification**: [`classify`] maps free-text case statuses to semantic flags
//! - **Sync engine**: [`SyncOrchestrator`] runs the reference → list → details
//!   phases in the background, [`UpsertEngine`] writes idempotent batches,
//!   [`ReferenceMaps`] resolves cross-entity references
//! - **Traits**: [`TokenProvider`], [`PracticeSource`], [`EntityStore`],
//!   [`SyncRegistry`] for dependency injection
//! - **Progress reporting**: [`SyncReporter`] trait for decoupled logging
//!
//! # Architecture
//!
//! This crate is designed to be reusable by different frontends (CLI, server).
//! It performs no I/O of its own; the HTTP client lives in `docket-client` and
//! the PostgreSQL store in `docket-db`.
//!
//! # Example
//!
//! ```ignore
//! use docket_core::{SyncConfig, SyncOrchestrator, SyncStart, SyncType, TracingSyncReporter};
//!
//! let orchestrator = SyncOrchestrator::new(store, registry, client, tokens, SyncConfig::default());
//!
//! if let SyncStart::Started(ticket) =
//!     orchestrator.start_sync(42, SyncType::Full, TracingSyncReporter).await?
//! {
//!     let report = ticket.wait().await?;
//!     println!("sync finished: {}", report.state);
//! }
//!
//! let view = orchestrator.get_sync_status(42, SyncType::Full).await?;
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod reference;
pub mod remote;
pub mod stats;
pub mod status;
pub mod sync;
pub mod traits;
pub mod upsert;

// Configuration
pub use config::{DbConfig, HttpConfig, SyncConfig};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{
    BatchOutcome, EntityBatch, EntityKind, Matter, MatterStatusRow, NewCategory, NewContact,
    NewMatter, NewMatterStatus, NewMatterType, NewUser, SyncRecord, UpsertAction, decide_upsert,
};

// Classification
pub use stats::MatterStats;
pub use status::{Classification, StatusCategory, classify, is_overdue, is_stale};

// Progress record
pub use job::{
    EntityCounts, PhaseProgress, SyncProgress, SyncProgressView, SyncState, SyncType, infer_phase,
};

// Sync types and reporting
pub use progress::{SilentSyncReporter, SyncEvent, SyncReporter, TracingSyncReporter};
pub use sync::{PhaseResult, SyncPhase, SyncStats};

// Traits for dependency injection
pub use traits::{
    Collection, EntityStore, FallbackTokenProvider, PracticeSource, SyncRegistry, TokenProvider,
};

// Services (generic over trait implementations)
pub use orchestrator::{SyncOrchestrator, SyncReport, SyncStart, SyncTicket};
pub use reference::ReferenceMaps;
pub use upsert::UpsertEngine;
