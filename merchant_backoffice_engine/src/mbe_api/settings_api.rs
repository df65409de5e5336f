//! Process-wide configuration registry.
//!
//! One `SettingsApi` instance is constructed at startup and injected wherever configuration is
//! read or written. There is no ambient global lookup.

use std::fmt::Debug;

use log::info;
use mbo_common::{Money, SpreadPercent};
use rust_decimal::Decimal;

use crate::{
    db_types::{Setting, SettingType},
    traits::{SettingsError, SettingsManagement},
};

/// Keys seeded by [`SettingsApi::init_defaults`]. The setter accepts these and nothing else.
pub mod keys {
    pub const FX_DEFAULT_SPREAD_PERCENT: &str = "fx.default_spread_percent";
    pub const FX_AUTO_REFRESH_ENABLED: &str = "fx.auto_refresh_enabled";
    pub const FX_BOOTSTRAP_PAIR: &str = "fx.bootstrap_pair";
    pub const FX_BOOTSTRAP_RATE: &str = "fx.bootstrap_rate";
    pub const SUPPORTED_CURRENCIES: &str = "currencies.supported";
    pub const RESERVE_RELEASE_CAP: &str = "reserve.release_cap";
    pub const RESERVE_RELEASE_HOUR_UTC: &str = "reserve.release_hour_utc";
    pub const API_RATE_LIMIT_PER_MINUTE: &str = "api.rate_limit_per_minute";
}

fn default_settings() -> Vec<Setting> {
    vec![
        Setting::new(
            keys::FX_DEFAULT_SPREAD_PERCENT,
            "2.5",
            SettingType::Decimal,
            "FX spread (percent) applied when a merchant has no spread of their own",
        ),
        Setting::new(
            keys::FX_AUTO_REFRESH_ENABLED,
            "false",
            SettingType::Bool,
            "Whether rates are refreshed from the external provider on a schedule",
        ),
        Setting::new(
            keys::FX_BOOTSTRAP_PAIR,
            "USD/BRL",
            SettingType::Text,
            "The single pair the bootstrap rate may stand in for while no snapshot exists",
        ),
        Setting::new(
            keys::FX_BOOTSTRAP_RATE,
            "5.88",
            SettingType::Decimal,
            "Temporary bootstrap rate for the bootstrap pair. Superseded by the first snapshot",
        ),
        Setting::new(
            keys::SUPPORTED_CURRENCIES,
            r#"["USD","BRL","EUR","GBP","MXN"]"#,
            SettingType::Json,
            "Currencies the back-office accepts for monetary events",
        ),
        Setting::new(
            keys::RESERVE_RELEASE_CAP,
            "5000.00",
            SettingType::Decimal,
            "Maximum amount the scheduled sweep releases per merchant per run",
        ),
        Setting::new(
            keys::RESERVE_RELEASE_HOUR_UTC,
            "6",
            SettingType::Int,
            "UTC hour of day after which the daily reserve release sweep runs",
        ),
        Setting::new(
            keys::API_RATE_LIMIT_PER_MINUTE,
            "120",
            SettingType::Int,
            "Request budget per client per minute, enforced by the HTTP layer",
        ),
    ]
}

/// `SettingsApi` provides read and admin-facing write access to the keyed configuration store.
pub struct SettingsApi<B> {
    db: B,
}

impl<B> Debug for SettingsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettingsApi")
    }
}

impl<B> SettingsApi<B>
where B: SettingsManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Seeds the fixed key list if missing. Idempotent; safe to call on every process start.
    pub async fn init_defaults(&self) -> Result<usize, SettingsError> {
        let seeded = self.db.seed_settings(&default_settings()).await?;
        if seeded > 0 {
            info!("🎛️ Seeded {seeded} default settings");
        }
        Ok(seeded)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
        self.db.fetch_setting(key).await
    }

    /// Updates an existing key after validating the value against the key's declared type.
    /// Keys that were never seeded are rejected; the setter does not create keys.
    pub async fn set(&self, key: &str, value: &str, updated_by: &str) -> Result<Setting, SettingsError> {
        let existing = self
            .db
            .fetch_setting(key)
            .await?
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        validate_value(&existing, value)?;
        let updated = self.db.update_setting(key, value, updated_by).await?;
        info!("🎛️ Setting {key} updated to '{value}' by {updated_by}");
        Ok(updated)
    }

    pub async fn get_decimal(&self, key: &str) -> Result<Option<Decimal>, SettingsError> {
        match self.db.fetch_setting(key).await? {
            None => Ok(None),
            Some(setting) => setting
                .as_decimal()
                .map(Some)
                .map_err(|e| SettingsError::InvalidValue { key: key.to_string(), reason: e.to_string() }),
        }
    }

    pub async fn get_money(&self, key: &str) -> Result<Option<Money>, SettingsError> {
        match self.db.fetch_setting(key).await? {
            None => Ok(None),
            Some(setting) => setting
                .as_money()
                .map(Some)
                .map_err(|e| SettingsError::InvalidValue { key: key.to_string(), reason: e.to_string() }),
        }
    }

    pub async fn get_int(&self, key: &str) -> Result<Option<i64>, SettingsError> {
        match self.db.fetch_setting(key).await? {
            None => Ok(None),
            Some(setting) => setting
                .as_int()
                .map(Some)
                .map_err(|e| SettingsError::InvalidValue { key: key.to_string(), reason: e.to_string() }),
        }
    }

    pub async fn get_bool(&self, key: &str) -> Result<Option<bool>, SettingsError> {
        match self.db.fetch_setting(key).await? {
            None => Ok(None),
            Some(setting) => setting
                .as_bool()
                .map(Some)
                .map_err(|e| SettingsError::InvalidValue { key: key.to_string(), reason: e.to_string() }),
        }
    }
}

/// Validates a spread percentage at the configuration boundary. Spreads live in `[0, 10]`;
/// the conversion path applies whatever was configured without re-checking.
pub fn validate_spread(spread: SpreadPercent) -> Result<(), SettingsError> {
    if spread.in_bounds() {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue {
            key: keys::FX_DEFAULT_SPREAD_PERCENT.to_string(),
            reason: format!("spread must lie in [0, {}], got {spread}", SpreadPercent::MAX_ALLOWED),
        })
    }
}

fn validate_value(existing: &Setting, value: &str) -> Result<(), SettingsError> {
    let invalid = |reason: String| SettingsError::InvalidValue { key: existing.key.clone(), reason };
    let candidate = Setting::new(&existing.key, value, existing.value_type, &existing.description);
    match existing.value_type {
        SettingType::Text => {},
        SettingType::Int => {
            candidate.as_int().map_err(|e| invalid(e.to_string()))?;
        },
        SettingType::Decimal => {
            candidate.as_decimal().map_err(|e| invalid(e.to_string()))?;
        },
        SettingType::Bool => {
            candidate.as_bool().map_err(|e| invalid(e.to_string()))?;
        },
        SettingType::Json => {
            serde_json::from_str::<serde_json::Value>(value).map_err(|e| invalid(e.to_string()))?;
        },
    }
    if existing.key == keys::FX_DEFAULT_SPREAD_PERCENT {
        let spread = SpreadPercent::new(candidate.as_decimal().map_err(|e| invalid(e.to_string()))?);
        validate_spread(spread)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn spread_validation_enforces_bounds() {
        assert!(validate_spread(SpreadPercent::from_str("0").unwrap()).is_ok());
        assert!(validate_spread(SpreadPercent::from_str("10").unwrap()).is_ok());
        assert!(validate_spread(SpreadPercent::from_str("10.5").unwrap()).is_err());
        assert!(validate_spread(SpreadPercent::from_str("-0.1").unwrap()).is_err());
    }

    #[test]
    fn values_are_checked_against_their_declared_type() {
        let setting = Setting::new(keys::RESERVE_RELEASE_HOUR_UTC, "6", SettingType::Int, "");
        assert!(validate_value(&setting, "7").is_ok());
        assert!(validate_value(&setting, "seven").is_err());

        let setting = Setting::new(keys::SUPPORTED_CURRENCIES, "[]", SettingType::Json, "");
        assert!(validate_value(&setting, r#"["USD"]"#).is_ok());
        assert!(validate_value(&setting, "not json").is_err());

        let setting = Setting::new(keys::FX_DEFAULT_SPREAD_PERCENT, "2.5", SettingType::Decimal, "");
        assert!(validate_value(&setting, "3.0").is_ok());
        assert!(validate_value(&setting, "12").is_err());
    }
}
