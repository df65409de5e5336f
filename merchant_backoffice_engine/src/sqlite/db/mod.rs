//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, maintained as plain functions that accept a
//! `&mut SqliteConnection`. Callers obtain a connection from the pool, or open a transaction
//! when several statements must commit together, and call through without any other changes.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod balances;
pub mod exchange_rates;
pub mod merchants;
pub mod settings;
pub mod verification;

const SQLITE_DB_URL: &str = "sqlite://data/mbo_store.db";

pub fn db_url() -> String {
    let result = env::var("MBO_DATABASE_URL").unwrap_or_else(|_| {
        info!("MBO_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
