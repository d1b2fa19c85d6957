//! Transaction Ledger
//!
//! In-memory source of truth for transactions. Summaries are always
//! recomputable from here; the cache only ever holds derived copies.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{AppError, Result};
use crate::summary::{
    NewTransaction, SummaryQuery, Transaction, TransactionFilter, TransactionUpdate,
};

// == Transaction Ledger ==
#[derive(Debug, Default)]
pub struct TransactionLedger {
    /// owner -> id -> transaction
    owners: RwLock<BTreeMap<String, BTreeMap<u64, Transaction>>>,
    next_id: AtomicU64,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // == Create ==
    /// Records a new transaction for `owner`. `input` is expected to be normalized.
    pub fn create(&self, owner: &str, input: NewTransaction) -> Transaction {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let tx = Transaction {
            id,
            owner: owner.to_string(),
            kind: input.kind,
            amount: input.amount,
            category: input.category,
            date: input.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            description: input.description,
        };

        self.owners
            .write()
            .entry(owner.to_string())
            .or_default()
            .insert(id, tx.clone());
        tx
    }

    // == List ==
    /// Returns the owner's transactions passing `filter`, newest date first.
    pub fn list(&self, owner: &str, filter: &TransactionFilter) -> Vec<Transaction> {
        let owners = self.owners.read();
        let mut txs: Vec<Transaction> = owners
            .get(owner)
            .map(|txs| {
                txs.values()
                    .filter(|tx| filter.matches(tx))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        txs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        txs
    }

    /// Returns the owner's transactions that fall inside the query window.
    pub fn matching(&self, owner: &str, query: &SummaryQuery) -> Vec<Transaction> {
        let owners = self.owners.read();
        owners
            .get(owner)
            .map(|txs| {
                txs.values()
                    .filter(|tx| query.contains(tx.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // == Get ==
    pub fn get(&self, owner: &str, id: u64) -> Result<Transaction> {
        self.owners
            .read()
            .get(owner)
            .and_then(|txs| txs.get(&id))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    // == Update ==
    /// Applies `update` to the owner's transaction `id`.
    pub fn update(&self, owner: &str, id: u64, update: TransactionUpdate) -> Result<Transaction> {
        let mut owners = self.owners.write();
        let tx = owners
            .get_mut(owner)
            .and_then(|txs| txs.get_mut(&id))
            .ok_or_else(|| not_found(id))?;
        update.apply(tx);
        Ok(tx.clone())
    }

    // == Delete ==
    pub fn delete(&self, owner: &str, id: u64) -> Result<Transaction> {
        let mut owners = self.owners.write();
        let txs = owners.get_mut(owner).ok_or_else(|| not_found(id))?;
        let removed = txs.remove(&id).ok_or_else(|| not_found(id))?;
        if txs.is_empty() {
            owners.remove(owner);
        }
        Ok(removed)
    }
}

fn not_found(id: u64) -> AppError {
    AppError::NotFound(format!("Transaction {} not found", id))
}
