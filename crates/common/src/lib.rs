//! BD Property Common Library
//!
//! Shared code for the BD Property listing services including:
//! - Listing domain types
//! - Query parsing and filter compilation
//! - Listing store abstraction with Postgres and in-memory backends
//! - Listing read services
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod listing;
pub mod metrics;
pub mod query;
pub mod services;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{ListingStore, MemoryStore, Repository};
pub use errors::{AppError, Result};
pub use listing::{Listing, ListingSummary};
pub use services::ListingService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
