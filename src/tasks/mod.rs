//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiry sweeper: reclaims expired cache entries at a configured interval

mod sweeper;

pub use sweeper::{spawn_sweeper, SweeperHandle};
