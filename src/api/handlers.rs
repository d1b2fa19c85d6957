//! API Handlers
//!
//! HTTP request handlers for the summary and cache endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::cache::MemoCache;
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ClearResponse, DeleteResponse, HealthResponse, StatsResponse, SummaryParams,
    TransactionListParams,
};
use crate::summary::{
    NewTransaction, Summary, SummaryService, Transaction, TransactionLedger, TransactionUpdate,
};

/// Application state shared across all handlers.
///
/// Cloning is cheap: the ledger and the cache are both shared handles.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: SummaryService,
}

impl AppState {
    pub fn new(service: SummaryService) -> Self {
        Self { service }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds an empty ledger and a summary cache with the configured
    /// default TTL and lock timeout.
    pub fn from_config(config: &Config) -> Self {
        let cache = MemoCache::from_config(config);
        Self::new(SummaryService::new(Arc::new(TransactionLedger::new()), cache))
    }

    /// The summary cache, e.g. for attaching a sweeper.
    pub fn cache(&self) -> &MemoCache<Summary> {
        self.service.cache()
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.cache().stats()?;
    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for DELETE /cache
///
/// Drops every cached summary and resets the counters.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache().clear_blocking().await;
    info!("Cache cleared via API");
    Json(ClearResponse::new())
}

/// Handler for GET /users/:owner/summary
pub async fn summary_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Summary>> {
    let query = params.into_query()?;
    let summary = state.service.summary(&owner, query)?;
    Ok(Json(summary))
}

/// Handler for GET /users/:owner/transactions
///
/// Optional `type`, `startDate` and `endDate` query parameters narrow the list.
pub async fn list_transactions_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<Vec<Transaction>>> {
    let filter = params.into_filter()?;
    Ok(Json(state.service.list_transactions(&owner, &filter)?))
}

/// Handler for GET /users/:owner/transactions/:id
pub async fn get_transaction_handler(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, u64)>,
) -> Result<Json<Transaction>> {
    Ok(Json(state.service.get_transaction(&owner, id)?))
}

/// Handler for POST /users/:owner/transactions
pub async fn create_transaction_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    Json(input): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let tx = state.service.record_transaction(&owner, input)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// Handler for PUT /users/:owner/transactions/:id
pub async fn update_transaction_handler(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, u64)>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<Transaction>> {
    Ok(Json(state.service.update_transaction(&owner, id, update)?))
}

/// Handler for DELETE /users/:owner/transactions/:id
pub async fn delete_transaction_handler(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, u64)>,
) -> Result<Json<DeleteResponse>> {
    let tx = state.service.delete_transaction(&owner, id)?;
    Ok(Json(DeleteResponse::new(tx.id)))
}
