use mbo_common::MoneyConversionError;
use thiserror::Error;

use crate::{
    db_types::CurrencyCode,
    traits::{BalanceApiError, ExchangeRateError, SettingsError},
};

#[derive(Debug, Clone, Error)]
pub enum FxApiError {
    #[error(transparent)]
    ExchangeRate(#[from] ExchangeRateError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("{0} is not a valid three-letter currency code")]
    InvalidCurrencyCode(CurrencyCode),
    #[error(transparent)]
    Conversion(#[from] MoneyConversionError),
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Balance(#[from] BalanceApiError),
    #[error(transparent)]
    Fx(#[from] FxApiError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Monetary amounts for this operation must be positive. Got {0}")]
    InvalidAmount(mbo_common::Money),
}
