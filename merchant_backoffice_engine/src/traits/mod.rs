//! # Storage contracts
//!
//! This module defines the interface contracts a database backend must implement to host the
//! merchant back-office engine.
//!
//! * [`BalanceManagement`] owns the three-bucket balance record and every transition between
//!   buckets. All of its mutations are atomic: a concurrent operation on the same merchant can
//!   never observe or commit a partial update.
//! * [`ExchangeRates`] is the append-only, versioned store of rate snapshots per currency pair.
//! * [`SettingsManagement`] is the keyed process-wide configuration store.
//! * [`VerificationStore`] holds encrypted verification document numbers.
//!
//! Each contract carries its own error enum so callers can match on business-rule failures
//! (insufficient funds, unknown rate pair) without string inspection.
mod balance_management;
mod exchange_rates;
mod settings_management;
mod verification;

pub use balance_management::{BalanceApiError, BalanceManagement};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use settings_management::{SettingsError, SettingsManagement};
pub use verification::{VerificationError, VerificationStore};

/// True when the error is a transient serialization/lock conflict the caller may retry.
/// SQLite reports these as BUSY (5), LOCKED (6) and their extended variants.
pub(crate) fn is_write_conflict(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517"))
}
