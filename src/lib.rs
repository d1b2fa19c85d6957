//! Summary Cache - memoized per-owner summaries over an in-memory ledger
//!
//! Provides an expiring key-value cache with owner-scoped invalidation and a
//! background expiry sweeper, plus the summary service and HTTP API built on it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod summary;
pub mod tasks;

pub use api::AppState;
pub use cache::{generate_key, CacheKey, CacheStats, KeyParams, MemoCache};
pub use config::Config;
pub use error::{AppError, CacheError};
pub use summary::SummaryService;
pub use tasks::{spawn_sweeper, SweeperHandle};
