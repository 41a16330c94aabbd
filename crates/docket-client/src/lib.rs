//! Docket Client - HTTP access to the remote case-management API
//!
//! This crate provides:
//!
//! - [`fetch`] - rate-limit aware request retry
//! - [`pagination`] - full-collection page loading
//! - [`practice`] - the typed API client implementing
//!   [`docket_core::traits::PracticeSource`]
//! - [`token`] - a static credential source
//!
//! # Overview
//!
//! The remote API allows roughly 120 requests per minute. The client sends
//! one request at a time, spaces page requests by
//! [`docket_core::HttpConfig::page_delay`] and backs off on 429/503.

pub mod fetch;
pub mod pagination;
pub mod practice;
pub mod token;

// Re-export main client types
pub use fetch::fetch_with_retry;
pub use pagination::{PaginationHeader, load_all_pages};
pub use practice::PracticeClient;
pub use token::StaticTokenProvider;
