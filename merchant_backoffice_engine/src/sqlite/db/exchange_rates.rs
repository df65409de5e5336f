use chrono::{DateTime, Utc};
use log::debug;
use mbo_common::Rate;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CurrencyCode, FxRateSnapshot, RateSource},
    traits::ExchangeRateError,
};

const SNAPSHOT_COLUMNS: &str =
    "id, base_currency, quote_currency, rate, source, fetched_at, effective_from, effective_to";

pub async fn fetch_current_rate(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    conn: &mut SqliteConnection,
) -> Result<FxRateSnapshot, ExchangeRateError> {
    sqlx::query_as::<_, FxRateSnapshot>(&format!(
        r#"SELECT {SNAPSHOT_COLUMNS} FROM fx_rate_snapshots
           WHERE base_currency = ? AND quote_currency = ? AND effective_to IS NULL"#
    ))
    .bind(base)
    .bind(quote)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ExchangeRateError::RateNotFound { base: base.clone(), quote: quote.clone() })
}

pub async fn fetch_rate_at(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<FxRateSnapshot, ExchangeRateError> {
    sqlx::query_as::<_, FxRateSnapshot>(&format!(
        r#"SELECT {SNAPSHOT_COLUMNS} FROM fx_rate_snapshots
           WHERE base_currency = ?1 AND quote_currency = ?2
             AND effective_from <= ?3
             AND (effective_to IS NULL OR effective_to > ?3)
           ORDER BY effective_from DESC LIMIT 1"#
    ))
    .bind(base)
    .bind(quote)
    .bind(at)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ExchangeRateError::RateNotFound { base: base.clone(), quote: quote.clone() })
}

/// Closes the open snapshot for the pair, if any. Must run in the same transaction as the
/// insert of the replacement so readers never see zero or two open snapshots.
pub async fn close_open_snapshot(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    closed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, ExchangeRateError> {
    let result = sqlx::query(
        r#"UPDATE fx_rate_snapshots SET effective_to = ?
           WHERE base_currency = ? AND quote_currency = ? AND effective_to IS NULL"#,
    )
    .bind(closed_at)
    .bind(base)
    .bind(quote)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_open_snapshot(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    rate: Rate,
    source: RateSource,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<FxRateSnapshot, ExchangeRateError> {
    let snapshot = sqlx::query_as::<_, FxRateSnapshot>(&format!(
        r#"INSERT INTO fx_rate_snapshots (base_currency, quote_currency, rate, source, fetched_at, effective_from)
           VALUES (?, ?, ?, ?, ?, ?)
           RETURNING {SNAPSHOT_COLUMNS}"#
    ))
    .bind(base)
    .bind(quote)
    .bind(rate)
    .bind(source)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("💱 New {} snapshot recorded: {snapshot}", snapshot.source);
    Ok(snapshot)
}

pub async fn fetch_history(
    base: &CurrencyCode,
    quote: &CurrencyCode,
    conn: &mut SqliteConnection,
) -> Result<Vec<FxRateSnapshot>, ExchangeRateError> {
    let snapshots = sqlx::query_as::<_, FxRateSnapshot>(&format!(
        r#"SELECT {SNAPSHOT_COLUMNS} FROM fx_rate_snapshots
           WHERE base_currency = ? AND quote_currency = ?
           ORDER BY effective_from"#
    ))
    .bind(base)
    .bind(quote)
    .fetch_all(conn)
    .await?;
    Ok(snapshots)
}
