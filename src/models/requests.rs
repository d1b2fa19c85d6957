//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming query strings.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::summary::{SummaryQuery, TransactionFilter, TransactionKind};

/// Query string for `GET /users/:owner/summary`
///
/// Kept as raw strings so malformed numbers produce the API's own error body.
/// Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryParams {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl SummaryParams {
    /// Parses the raw parameters into a summary query.
    pub fn into_query(self) -> Result<SummaryQuery> {
        Ok(SummaryQuery {
            month: parse_param("month", self.month)?,
            year: parse_param("year", self.year)?,
        })
    }
}

/// Query string for `GET /users/:owner/transactions`
///
/// `type` is `income` or `expense`; `startDate`/`endDate` are `YYYY-MM-DD`
/// and inclusive. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
}

impl TransactionListParams {
    /// Parses the raw parameters into a listing filter.
    pub fn into_filter(self) -> Result<TransactionFilter> {
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("income") => Some(TransactionKind::Income),
            Some("expense") => Some(TransactionKind::Expense),
            Some(other) => {
                return Err(AppError::InvalidRequest(format!(
                    "type must be 'income' or 'expense', got '{}'",
                    other
                )))
            }
        };
        Ok(TransactionFilter {
            kind,
            start_date: parse_date("startDate", self.start_date)?,
            end_date: parse_date("endDate", self.end_date)?,
        })
    }
}

fn parse_date(name: &str, raw: Option<String>) -> Result<Option<NaiveDate>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::InvalidRequest(format!(
                    "{} must be a date (YYYY-MM-DD), got '{}'",
                    name, value
                ))
            }),
    }
}

fn parse_param<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            AppError::InvalidRequest(format!("{} must be an integer, got '{}'", name, value))
        }),
    }
}
