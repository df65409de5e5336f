use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mbo_common::{Money, Rate, SpreadPercent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------     MerchantId      ---------------------------------------------------------
/// Opaque reference to a merchant entity owned by the upstream profile service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MerchantId(pub String);

impl<S: Into<String>> From<S> for MerchantId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for MerchantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MerchantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    CurrencyCode     ---------------------------------------------------------
/// A three-letter currency code, normalised to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl<S: AsRef<str>> From<S> for CurrencyCode {
    fn from(value: S) -> Self {
        Self(value.as_ref().trim().to_ascii_uppercase())
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   MerchantStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum MerchantStatus {
    /// The merchant is live and included in scheduled jobs.
    Active,
    /// Temporarily blocked by an admin. Balances are kept but not swept.
    Suspended,
    /// The merchant has been off-boarded.
    Closed,
}

impl Display for MerchantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MerchantStatus::Active => write!(f, "Active"),
            MerchantStatus::Suspended => write!(f, "Suspended"),
            MerchantStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl FromStr for MerchantStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Suspended" => Ok(Self::Suspended),
            "Closed" => Ok(Self::Closed),
            s => Err(ConversionError(format!("Invalid merchant status: {s}"))),
        }
    }
}

//--------------------------------------   MerchantProfile   ---------------------------------------------------------
/// The slice of the merchant record this engine consumes. Written by the upstream profile
/// service (which derives the currencies via [`crate::helpers::derive_currency_profile`] before
/// persisting), read here for balance creation and FX spread resolution.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub merchant_id: MerchantId,
    pub status: MerchantStatus,
    pub country: String,
    pub dashboard_currency: CurrencyCode,
    pub payout_currency: CurrencyCode,
    /// `None` means the global default spread applies.
    pub fx_spread_percent: Option<SpreadPercent>,
    pub sells_internationally: bool,
}

//--------------------------------------       Balance       ---------------------------------------------------------
/// The three-bucket balance for a single merchant, denominated in the merchant's dashboard
/// currency. Created lazily on first access and never deleted while the merchant exists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub merchant_id: MerchantId,
    pub dashboard_currency: CurrencyCode,
    pub reserve: Money,
    pub available: Money,
    pub pending: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Derived, never stored.
    pub fn total_balance(&self) -> Money {
        self.reserve + self.available + self.pending
    }
}

//--------------------------------------  MovementOperation  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum MovementOperation {
    CreditReserve,
    ReleaseReserve,
    DebitAvailable,
    Refund,
    AdminAdjust,
}

impl Display for MovementOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementOperation::CreditReserve => write!(f, "CreditReserve"),
            MovementOperation::ReleaseReserve => write!(f, "ReleaseReserve"),
            MovementOperation::DebitAvailable => write!(f, "DebitAvailable"),
            MovementOperation::Refund => write!(f, "Refund"),
            MovementOperation::AdminAdjust => write!(f, "AdminAdjust"),
        }
    }
}

//--------------------------------------   BalanceMovement   ---------------------------------------------------------
/// One row of the append-only audit trail. Deltas are the applied (post-clamp) changes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BalanceMovement {
    pub id: i64,
    pub merchant_id: MerchantId,
    pub operation: MovementOperation,
    pub reserve_delta: Money,
    pub available_delta: Money,
    pub pending_delta: Money,
    pub reference: String,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  AdjustmentDeltas   ---------------------------------------------------------
/// Signed per-bucket deltas for a manual admin adjustment. At least one bucket must be given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentDeltas {
    pub reserve: Option<Money>,
    pub available: Option<Money>,
    pub pending: Option<Money>,
}

impl AdjustmentDeltas {
    pub fn with_reserve(mut self, delta: Money) -> Self {
        self.reserve = Some(delta);
        self
    }

    pub fn with_available(mut self, delta: Money) -> Self {
        self.available = Some(delta);
        self
    }

    pub fn with_pending(mut self, delta: Money) -> Self {
        self.pending = Some(delta);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.reserve.is_none() && self.available.is_none() && self.pending.is_none()
    }
}

//--------------------------------------    RefundOutcome    ---------------------------------------------------------
/// Result of applying a refund. `shortfall` is the part of the refund the held funds could not
/// cover; when it is non-zero the buckets were clamped to zero and the record needs out-of-band
/// reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub balance: Balance,
    pub from_reserve: Money,
    pub from_available: Money,
    pub shortfall: Money,
}

impl RefundOutcome {
    pub fn clamped(&self) -> bool {
        self.shortfall.is_positive()
    }
}

//--------------------------------------      RateSource     ---------------------------------------------------------
/// Provenance of an exchange-rate snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RateSource {
    /// Entered by an admin.
    Manual,
    /// Pulled from the external rate provider by a refresh.
    Refreshed,
    /// The configured bootstrap value, used only while a pair has no snapshot yet.
    Bootstrap,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSource::Manual => write!(f, "Manual"),
            RateSource::Refreshed => write!(f, "Refreshed"),
            RateSource::Bootstrap => write!(f, "Bootstrap"),
        }
    }
}

impl FromStr for RateSource {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manual" => Ok(Self::Manual),
            "Refreshed" => Ok(Self::Refreshed),
            "Bootstrap" => Ok(Self::Bootstrap),
            s => Err(ConversionError(format!("Invalid rate source: {s}"))),
        }
    }
}

//--------------------------------------   FxRateSnapshot    ---------------------------------------------------------
/// One entry of a pair's non-overlapping rate timeline. `effective_to = None` marks the
/// currently active snapshot; at most one per pair is open at any time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FxRateSnapshot {
    pub id: i64,
    pub base_currency: CurrencyCode,
    pub quote_currency: CurrencyCode,
    pub rate: Rate,
    pub source: RateSource,
    pub fetched_at: DateTime<Utc>,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

impl FxRateSnapshot {
    pub fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }
}

impl Display for FxRateSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 {} => {} {} ({})", self.base_currency, self.rate, self.quote_currency, self.source)
    }
}

//--------------------------------------      SettingType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SettingType {
    Text,
    Int,
    Decimal,
    Bool,
    Json,
}

impl Display for SettingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingType::Text => write!(f, "Text"),
            SettingType::Int => write!(f, "Int"),
            SettingType::Decimal => write!(f, "Decimal"),
            SettingType::Bool => write!(f, "Bool"),
            SettingType::Json => write!(f, "Json"),
        }
    }
}

//--------------------------------------        Setting      ---------------------------------------------------------
/// A keyed process-wide configuration entry. Keys are fixed at seeding time; the setter only
/// accepts keys that already exist.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub value_type: SettingType,
    pub description: String,
    pub updated_by: String,
}

impl Setting {
    pub fn new(key: &str, value: &str, value_type: SettingType, description: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            value_type,
            description: description.to_string(),
            updated_by: "system".to_string(),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal, ConversionError> {
        self.value
            .trim()
            .parse::<Decimal>()
            .map_err(|e| ConversionError(format!("Setting {} is not a decimal: {e}", self.key)))
    }

    pub fn as_int(&self) -> Result<i64, ConversionError> {
        self.value
            .trim()
            .parse::<i64>()
            .map_err(|e| ConversionError(format!("Setting {} is not an integer: {e}", self.key)))
    }

    pub fn as_money(&self) -> Result<Money, ConversionError> {
        self.value
            .parse::<Money>()
            .map_err(|e| ConversionError(format!("Setting {} is not a monetary amount: {e}", self.key)))
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConversionError(format!("Setting {} is not a boolean: {other}", self.key))),
        }
    }
}

//-------------------------------------- VerificationDocument ---------------------------------------------------------
/// An encrypted verification document number. Only the ciphertext is ever persisted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub merchant_id: MerchantId,
    pub kind: String,
    pub number_ciphertext: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
