//! Merchant Back-Office Engine
//!
//! The core of the merchant payments back-office: the multi-currency balance ledger, the
//! versioned FX rate store and spread-adjusted converter, the settings registry, and the
//! scheduled reserve release job. It is storage-provider-agnostic; HTTP routing, auth and the
//! rest of the outer surface live elsewhere and call in through the public API.
//!
//! The library is divided into two main sections:
//! 1. Storage contracts and backends. The [`traits`] module defines what a backend must
//!    provide; [`SqliteDatabase`] is the bundled SQLite implementation. You should never need
//!    to touch the database modules directly — the exception is the data types, which are
//!    public in [`db_types`].
//! 2. The public API: [`BalanceApi`] for the three-bucket ledger, [`FxApi`] for conversion and
//!    rate snapshots, [`SettingsApi`] for configuration, and [`VerificationApi`] for encrypted
//!    verification documents.
//!
//! The engine also emits events (negative balance on a clamped refund, reserve released by the
//! scheduled sweep). A simple actor-style hook system in [`events`] lets you subscribe to
//! these and react asynchronously.
pub mod db_types;
pub mod events;
pub mod helpers;
mod mbe_api;
pub mod reserve_worker;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(all(any(feature = "test_utils", test), feature = "sqlite"))]
pub mod test_utils;

pub use mbe_api::{
    setting_keys,
    validate_spread,
    BalanceApi,
    Conversion,
    FxApi,
    FxApiError,
    LedgerError,
    SettingsApi,
    SweepResult,
    VerificationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
