//! Summary Service
//!
//! Read-through memoization of per-owner summaries. Reads consult the cache
//! first; writes go to the ledger and then invalidate everything cached for
//! the owner, so a changed ledger is never summarized from a stale entry.
//!
//! A read captures the owner's invalidation generation before touching the
//! ledger and only stores its result if no invalidation happened meanwhile,
//! so a write landing between compute and store cannot leave a stale entry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{generate_key, CacheKey, KeyParams, MemoCache};
use crate::error::{AppError, CacheResult, Result};
use crate::summary::{
    NewTransaction, Summary, SummaryQuery, Transaction, TransactionFilter, TransactionLedger,
    TransactionUpdate,
};

/// Namespace for summary cache keys.
pub const SUMMARY_NAMESPACE: &str = "summary";

/// Builds the cache key for an owner's summary over `query`.
pub fn summary_key(owner: &str, query: &SummaryQuery) -> CacheResult<CacheKey> {
    let params = KeyParams::new()
        .with("userId", owner)
        .with_opt("month", query.month)
        .with_opt("year", query.year);
    generate_key(SUMMARY_NAMESPACE, &params)
}

// == Summary Service ==
#[derive(Debug, Clone)]
pub struct SummaryService {
    ledger: Arc<TransactionLedger>,
    cache: MemoCache<Summary>,
    /// TTL for cached summaries; `None` uses the cache default
    ttl: Option<Duration>,
}

impl SummaryService {
    pub fn new(ledger: Arc<TransactionLedger>, cache: MemoCache<Summary>) -> Self {
        Self {
            ledger,
            cache,
            ttl: None,
        }
    }

    /// Overrides the TTL used for cached summaries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache(&self) -> &MemoCache<Summary> {
        &self.cache
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    // == Summary ==
    /// Returns the owner's summary for `query`, from cache when fresh.
    ///
    /// Cache failures never fail the call: an unreadable cache is treated as
    /// a miss and an unwritable one just means the result isn't memoized.
    pub fn summary(&self, owner: &str, query: SummaryQuery) -> Result<Summary> {
        self.read_through(owner, query, |service, query| service.compute(owner, query))
    }

    fn read_through<F>(&self, owner: &str, query: SummaryQuery, compute: F) -> Result<Summary>
    where
        F: FnOnce(&Self, &SummaryQuery) -> Summary,
    {
        validate_owner(owner)?;
        let query = query.normalize()?;

        let key = match summary_key(owner, &query) {
            Ok(key) => key,
            Err(err) => {
                warn!(owner, "Summary not cacheable, computing directly: {}", err);
                return Ok(compute(self, &query));
            }
        };

        let generation = match self.cache.owner_generation(owner) {
            Ok(generation) => generation,
            Err(err) => {
                warn!(key = %key, "Cache unavailable, computing directly: {}", err);
                return Ok(compute(self, &query));
            }
        };

        match self.cache.get(key.as_str()) {
            Ok(Some(summary)) => {
                debug!(key = %key, "summary cache hit");
                return Ok(summary);
            }
            Ok(None) => debug!(key = %key, "summary cache miss"),
            Err(err) => warn!(key = %key, "Cache read failed, recomputing: {}", err),
        }

        let summary = compute(self, &query);
        match self
            .cache
            .set_owned_if_current(owner, &key, summary.clone(), self.ttl, generation)
        {
            Ok(true) => {}
            Ok(false) => debug!(key = %key, "owner changed during compute, summary not cached"),
            Err(err) => warn!(key = %key, "Failed to cache summary: {}", err),
        }
        Ok(summary)
    }

    fn compute(&self, owner: &str, query: &SummaryQuery) -> Summary {
        Summary::compute(&self.ledger.matching(owner, query))
    }

    // == Transactions ==
    pub fn list_transactions(
        &self,
        owner: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        validate_owner(owner)?;
        Ok(self.ledger.list(owner, filter))
    }

    pub fn get_transaction(&self, owner: &str, id: u64) -> Result<Transaction> {
        validate_owner(owner)?;
        self.ledger.get(owner, id)
    }

    /// Records a transaction and invalidates the owner's cached summaries.
    pub fn record_transaction(&self, owner: &str, input: NewTransaction) -> Result<Transaction> {
        validate_owner(owner)?;
        let tx = self.ledger.create(owner, input.normalize()?);
        self.invalidate(owner);
        Ok(tx)
    }

    /// Updates a transaction and invalidates the owner's cached summaries.
    pub fn update_transaction(
        &self,
        owner: &str,
        id: u64,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        validate_owner(owner)?;
        let tx = self.ledger.update(owner, id, update.normalize()?)?;
        self.invalidate(owner);
        Ok(tx)
    }

    /// Deletes a transaction and invalidates the owner's cached summaries.
    pub fn delete_transaction(&self, owner: &str, id: u64) -> Result<Transaction> {
        validate_owner(owner)?;
        let tx = self.ledger.delete(owner, id)?;
        self.invalidate(owner);
        Ok(tx)
    }

    fn invalidate(&self, owner: &str) {
        match self.cache.invalidate(owner) {
            Ok(removed) => debug!(owner, removed, "invalidated cached summaries"),
            // Entries left behind still expire by TTL
            Err(err) => warn!(owner, "Failed to invalidate cached summaries: {}", err),
        }
    }
}

fn validate_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(AppError::InvalidRequest("owner cannot be empty".to_string()));
    }
    Ok(())
}
