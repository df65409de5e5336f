//! Spread-adjusted currency conversion on top of the versioned rate store.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use mbo_common::{Money, Rate, SpreadPercent};

use crate::{
    db_types::{CurrencyCode, FxRateSnapshot, RateSource},
    mbe_api::{errors::FxApiError, settings_api::keys},
    traits::{ExchangeRateError, ExchangeRates, SettingsManagement},
};

/// The result of a conversion: the amount in the target currency, rounded to the cent, and the
/// spread-adjusted rate that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub converted: Money,
    pub effective_rate: Rate,
}

/// `FxApi` turns (amount, from, to, spread?) requests into converted amounts.
///
/// The spread is applied as a multiplicative discount on the market rate
/// (`effective = rate * (1 - spread/100)`), so the platform's margin works in its favour
/// whichever direction the conversion runs. When no merchant-specific spread is supplied the
/// global default from the settings registry applies. Spread bounds are enforced where spreads
/// are configured, not here.
pub struct FxApi<B> {
    db: B,
}

impl<B> Debug for FxApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FxApi")
    }
}

impl<B> FxApi<B>
where B: ExchangeRates + SettingsManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The current market rate for the pair. Same-currency pairs short-circuit to 1 without
    /// touching the store. A pair with no snapshot falls back to the configured bootstrap
    /// value when (and only when) it is the configured bootstrap pair; every other unknown
    /// pair fails with [`ExchangeRateError::RateNotFound`].
    pub async fn current_rate(&self, base: &CurrencyCode, quote: &CurrencyCode) -> Result<Rate, FxApiError> {
        self.validate_pair(base, quote)?;
        if base == quote {
            return Ok(Rate::ONE);
        }
        match self.db.fetch_current_rate(base, quote).await {
            Ok(snapshot) => Ok(snapshot.rate),
            Err(ExchangeRateError::RateNotFound { .. }) => match self.bootstrap_rate(base, quote).await? {
                Some(rate) => {
                    warn!(
                        "💱 No snapshot recorded for {base}/{quote} yet. Using the configured bootstrap rate {rate}"
                    );
                    Ok(rate)
                },
                None => Err(ExchangeRateError::RateNotFound { base: base.clone(), quote: quote.clone() }.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// The market rate that was in effect at `at`. No bootstrap fallback applies to
    /// historical lookups.
    pub async fn rate_at(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<Rate, FxApiError> {
        self.validate_pair(base, quote)?;
        if base == quote {
            return Ok(Rate::ONE);
        }
        let snapshot = self.db.fetch_rate_at(base, quote, at).await?;
        Ok(snapshot.rate)
    }

    /// Records a new rate for the pair, closing out the previous snapshot atomically.
    pub async fn snapshot_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        rate: Rate,
        source: RateSource,
    ) -> Result<FxRateSnapshot, FxApiError> {
        self.validate_pair(base, quote)?;
        let snapshot = self.db.insert_rate_snapshot(base, quote, rate, source).await?;
        Ok(snapshot)
    }

    pub async fn rate_history(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Vec<FxRateSnapshot>, FxApiError> {
        self.validate_pair(base, quote)?;
        let history = self.db.fetch_rate_history(base, quote).await?;
        Ok(history)
    }

    /// The spread-adjusted rate for the pair. `spread = None` means the global default.
    pub async fn effective_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        spread: Option<SpreadPercent>,
    ) -> Result<Rate, FxApiError> {
        if base == quote {
            return Ok(Rate::ONE);
        }
        let market = self.current_rate(base, quote).await?;
        let spread = match spread {
            Some(spread) => spread,
            None => self.default_spread().await?,
        };
        Ok(market.with_spread(spread))
    }

    /// Converts `amount` from one currency into another. Identity when the currencies match:
    /// rate 1, amount unchanged, rate store untouched. Otherwise the converted amount is
    /// `round2(amount * effective_rate)`; the rate itself is never rounded.
    pub async fn convert(
        &self,
        amount: Money,
        from: &CurrencyCode,
        to: &CurrencyCode,
        spread: Option<SpreadPercent>,
    ) -> Result<Conversion, FxApiError> {
        if from == to {
            return Ok(Conversion { converted: amount, effective_rate: Rate::ONE });
        }
        let effective_rate = self.effective_rate(from, to, spread).await?;
        let converted = amount.convert_at(effective_rate)?;
        debug!("💱 Converted {amount} {from} => {converted} {to} at {effective_rate}");
        Ok(Conversion { converted, effective_rate })
    }

    async fn default_spread(&self) -> Result<SpreadPercent, FxApiError> {
        let Some(setting) = self.db.fetch_setting(keys::FX_DEFAULT_SPREAD_PERCENT).await? else {
            warn!("💱 The default spread setting has not been seeded. Applying no spread");
            return Ok(SpreadPercent::default());
        };
        let value = setting.as_decimal().map_err(|e| {
            FxApiError::Settings(crate::traits::SettingsError::InvalidValue {
                key: setting.key.clone(),
                reason: e.to_string(),
            })
        })?;
        Ok(SpreadPercent::new(value))
    }

    /// The configured bootstrap rate, if the requested pair is the configured bootstrap pair.
    async fn bootstrap_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Option<Rate>, FxApiError> {
        let Some(pair) = self.db.fetch_setting(keys::FX_BOOTSTRAP_PAIR).await? else {
            return Ok(None);
        };
        let Some((cfg_base, cfg_quote)) = pair.value.split_once('/') else {
            return Ok(None);
        };
        if &CurrencyCode::from(cfg_base) != base || &CurrencyCode::from(cfg_quote) != quote {
            return Ok(None);
        }
        let Some(rate) = self.db.fetch_setting(keys::FX_BOOTSTRAP_RATE).await? else {
            return Ok(None);
        };
        let value = rate.as_decimal().map_err(|e| {
            FxApiError::Settings(crate::traits::SettingsError::InvalidValue {
                key: rate.key.clone(),
                reason: e.to_string(),
            })
        })?;
        Ok(Some(Rate::new(value)))
    }

    fn validate_pair(&self, base: &CurrencyCode, quote: &CurrencyCode) -> Result<(), FxApiError> {
        for code in [base, quote] {
            if !code.is_well_formed() {
                return Err(FxApiError::InvalidCurrencyCode(code.clone()));
            }
        }
        Ok(())
    }
}
