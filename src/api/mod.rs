//! API Module
//!
//! HTTP handlers and routing for the summary server REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Get cache statistics
//! - `DELETE /cache` - Clear the cache and its counters
//! - `GET /users/:owner/summary` - Cached summary, optional `month`/`year` window
//! - `GET|POST /users/:owner/transactions` - List or record transactions
//! - `GET|PUT|DELETE /users/:owner/transactions/:id` - Fetch, update or delete a transaction

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
