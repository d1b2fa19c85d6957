//! Summary domain types: transactions, summary queries and computed summaries.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// == Transaction Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

// == Transaction ==
/// A single recorded transaction belonging to one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: u64,
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fields for a new transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTransaction {
    /// Validates and normalizes the input (trims text, defaults the date).
    pub fn normalize(mut self) -> Result<Self> {
        validate_amount(self.amount)?;
        self.category = normalize_category(&self.category)?;
        self.description = normalize_description(self.description);
        self.date.get_or_insert_with(|| chrono::Local::now().date_naive());
        Ok(self)
    }
}

/// Partial update of a transaction; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TransactionUpdate {
    pub fn normalize(mut self) -> Result<Self> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            self.category = Some(normalize_category(category)?);
        }
        self.description = normalize_description(self.description);
        Ok(self)
    }

    /// Applies the present fields to `tx`.
    pub fn apply(self, tx: &mut Transaction) {
        if let Some(kind) = self.kind {
            tx.kind = kind;
        }
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(category) = self.category {
            tx.category = category;
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if self.description.is_some() {
            tx.description = self.description;
        }
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidRequest(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn normalize_category(category: &str) -> Result<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("category cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

// == Transaction Filter ==
/// Narrows a transaction listing. Absent fields match everything; date bounds
/// are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.map_or(true, |kind| tx.kind == kind)
            && self.start_date.map_or(true, |start| tx.date >= start)
            && self.end_date.map_or(true, |end| tx.date <= end)
    }
}

// == Summary Query ==
/// Optional calendar-month window for a summary.
///
/// The window only applies when both `month` and `year` are given; with
/// either one missing the summary covers all transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SummaryQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl SummaryQuery {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn for_month(year: i32, month: u32) -> Self {
        Self {
            month: Some(month),
            year: Some(year),
        }
    }

    /// Rejects out-of-range months and drops a half-specified window, so
    /// equivalent queries share a cache key.
    pub fn normalize(self) -> Result<Self> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(AppError::InvalidRequest(format!(
                    "month must be between 1 and 12, got {}",
                    month
                )));
            }
        }
        Ok(match (self.month, self.year) {
            (Some(_), Some(_)) => self,
            _ => Self::all_time(),
        })
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.month, self.year) {
            (Some(month), Some(year)) => date.year() == year && date.month() == month,
            _ => true,
        }
    }
}

// == Summary ==
/// Totals over an owner's transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    /// Sum of amounts per category, across both kinds
    pub by_category: BTreeMap<String, f64>,
}

impl Summary {
    /// Aggregates the given transactions.
    pub fn compute<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = Summary::default();

        for tx in transactions {
            match tx.kind {
                TransactionKind::Income => summary.total_income += tx.amount,
                TransactionKind::Expense => summary.total_expense += tx.amount,
            }
            *summary.by_category.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
        }

        summary.balance = summary.total_income - summary.total_expense;
        summary
    }
}
