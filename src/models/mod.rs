//! Request and Response models for the HTTP API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies. Transaction
//! bodies reuse the domain types from `summary` directly.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{SummaryParams, TransactionListParams};
pub use responses::{ClearResponse, DeleteResponse, ErrorResponse, HealthResponse, StatsResponse};
