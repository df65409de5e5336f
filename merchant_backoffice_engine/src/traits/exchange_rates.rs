use chrono::{DateTime, Utc};
use mbo_common::Rate;
use thiserror::Error;

use crate::db_types::{CurrencyCode, FxRateSnapshot, RateSource};

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Concurrent mutation conflict on the rate snapshot: {0}")]
    WriteConflict(String),
    #[error("No exchange rate is recorded for {base}/{quote}")]
    RateNotFound { base: CurrencyCode, quote: CurrencyCode },
    #[error("Exchange rates must be positive. Got {0}")]
    InvalidRate(Rate),
}

impl From<sqlx::Error> for ExchangeRateError {
    fn from(e: sqlx::Error) -> Self {
        if super::is_write_conflict(&e) {
            ExchangeRateError::WriteConflict(e.to_string())
        } else {
            ExchangeRateError::DatabaseError(e.to_string())
        }
    }
}

impl ExchangeRateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeRateError::WriteConflict(_))
    }
}

/// The `ExchangeRates` trait defines the behaviour of the versioned rate store.
///
/// Snapshots for a pair form a non-overlapping timeline ordered by `effective_from`, with at
/// most one open snapshot (`effective_to = None`) per pair. Snapshots are never mutated after
/// creation except to close their validity window, and never deleted.
///
/// Currency pairs are always normalised (uppercase) before they reach the store.
#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// The currently open snapshot for the pair, or [`ExchangeRateError::RateNotFound`].
    fn fetch_current_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> impl ::std::future::Future<Output = Result<FxRateSnapshot, ExchangeRateError>> + Send;

    /// The snapshot whose `[effective_from, effective_to)` window contains `at`.
    fn fetch_rate_at(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        at: DateTime<Utc>,
    ) -> impl ::std::future::Future<Output = Result<FxRateSnapshot, ExchangeRateError>> + Send;

    /// Closes any open snapshot for the pair and inserts a new open one, atomically. A
    /// concurrent reader never observes zero or two open snapshots for the same pair.
    fn insert_rate_snapshot(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        rate: Rate,
        source: RateSource,
    ) -> impl ::std::future::Future<Output = Result<FxRateSnapshot, ExchangeRateError>> + Send;

    /// The full timeline for a pair, oldest first.
    fn fetch_rate_history(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> impl ::std::future::Future<Output = Result<Vec<FxRateSnapshot>, ExchangeRateError>> + Send;
}
