//! Summary Module
//!
//! The aggregation side of the system: transactions are the source of truth,
//! summaries over them are derived and memoized in the cache.

mod ledger;
mod model;
mod service;

pub use ledger::TransactionLedger;
pub use model::{
    NewTransaction, Summary, SummaryQuery, Transaction, TransactionFilter, TransactionKind,
    TransactionUpdate,
};
pub use service::{summary_key, SummaryService, SUMMARY_NAMESPACE};
