use thiserror::Error;

use crate::db_types::Setting;

#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Concurrent mutation conflict on the settings record: {0}")]
    WriteConflict(String),
    #[error("Unknown setting key: {0}. Only seeded keys can be updated")]
    UnknownKey(String),
    #[error("Invalid value for setting {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<sqlx::Error> for SettingsError {
    fn from(e: sqlx::Error) -> Self {
        if super::is_write_conflict(&e) {
            SettingsError::WriteConflict(e.to_string())
        } else {
            SettingsError::DatabaseError(e.to_string())
        }
    }
}

impl SettingsError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettingsError::WriteConflict(_))
    }
}

/// The `SettingsManagement` trait defines the behaviour of the keyed configuration store.
/// Keys come into existence only through seeding; the setter rejects unknown keys.
#[allow(async_fn_in_trait)]
pub trait SettingsManagement {
    fn fetch_setting(&self, key: &str) -> impl ::std::future::Future<Output = Result<Option<Setting>, SettingsError>> + Send;

    /// Updates an existing key. Fails with [`SettingsError::UnknownKey`] when the key was
    /// never seeded.
    fn update_setting(&self, key: &str, value: &str, updated_by: &str) -> impl ::std::future::Future<Output = Result<Setting, SettingsError>> + Send;

    /// Inserts every entry that is not already present, leaving existing values untouched.
    /// Returns the number of newly seeded entries. Safe to call on every process start.
    fn seed_settings(&self, defaults: &[Setting]) -> impl ::std::future::Future<Output = Result<usize, SettingsError>> + Send;
}
