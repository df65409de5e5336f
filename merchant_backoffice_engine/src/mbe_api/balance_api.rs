//! The primary API for the three-bucket merchant balance ledger.

use std::fmt::{self, Debug, Display};

use log::*;
use mbo_common::Money;

use crate::{
    db_types::{
        AdjustmentDeltas,
        Balance,
        BalanceMovement,
        CurrencyCode,
        MerchantId,
        RefundOutcome,
    },
    events::{EventProducers, NegativeBalanceEvent, ReserveReleasedEvent},
    mbe_api::{
        errors::LedgerError,
        fx_api::FxApi,
        settings_api::{keys, SettingsApi},
    },
    traits::{BalanceApiError, BalanceManagement, ExchangeRates, SettingsManagement},
};

/// Fallback cap when the sweep setting is missing, in dashboard-currency cents.
const DEFAULT_RELEASE_CAP: Money = Money::ZERO;

/// Aggregate outcome of one reserve release sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepResult {
    pub merchants_processed: u32,
    pub merchants_failed: u32,
    pub total_released: Money,
}

impl Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "released {} across {} merchants ({} failures)",
            self.total_released, self.merchants_processed, self.merchants_failed
        )
    }
}

/// `BalanceApi` handles every monetary event against a merchant balance: sale credits, reserve
/// releases, payout debits, refunds and admin adjustments.
///
/// Incoming amounts are normalised into the merchant's dashboard currency through [`FxApi`]
/// when the currencies differ, using the merchant's own spread when one is configured. The
/// bucket arithmetic itself is delegated to the [`BalanceManagement`] backend, which commits
/// each operation atomically.
pub struct BalanceApi<B> {
    db: B,
    fx: FxApi<B>,
    producers: EventProducers,
}

impl<B> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BalanceApi")
    }
}

impl<B> BalanceApi<B>
where B: BalanceManagement + ExchangeRates + SettingsManagement + Clone
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        let fx = FxApi::new(db.clone());
        Self { db, fx, producers }
    }

    /// The FX converter backing this ledger.
    pub fn fx(&self) -> &FxApi<B> {
        &self.fx
    }

    /// The merchant's balance, created zeroed in the dashboard currency on first access.
    pub async fn balance(&self, merchant_id: &MerchantId) -> Result<Balance, LedgerError> {
        let balance = self.db.ensure_balance(merchant_id).await?;
        Ok(balance)
    }

    /// Credits a sale amount into the reserve bucket. `currency` is the currency the event
    /// arrived in; a mismatch with the dashboard currency triggers conversion.
    pub async fn credit_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        currency: &CurrencyCode,
        reference: &str,
    ) -> Result<Balance, LedgerError> {
        let amount = self.positive(amount)?;
        let converted = self.normalise(merchant_id, amount, currency).await?;
        let balance = self.db.credit_reserve(merchant_id, converted, reference).await?;
        debug!("💼 Reserve credit of {converted} {} applied for merchant {merchant_id} [{reference}]", balance.dashboard_currency);
        Ok(balance)
    }

    /// Moves funds from reserve into available. `reserve + available` is conserved.
    pub async fn release_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<Balance, LedgerError> {
        let amount = self.positive(amount)?;
        let balance = self.db.release_reserve(merchant_id, amount, reference).await?;
        debug!("💼 {amount} released for merchant {merchant_id} [{reference}]");
        Ok(balance)
    }

    /// Debits the available bucket, e.g. for a payout. Payout execution itself lives outside
    /// this engine; the ledger only records the balance mutation.
    pub async fn debit_available(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<Balance, LedgerError> {
        let amount = self.positive(amount)?;
        let balance = self.db.debit_available(merchant_id, amount, reference).await?;
        debug!("💼 {amount} debited for merchant {merchant_id} [{reference}]");
        Ok(balance)
    }

    /// Applies a refund or chargeback. Refunds are externally triggered and must never be
    /// rejected by the ledger: when the held funds cannot cover the amount, the buckets are
    /// clamped to zero, a warning is logged and a [`NegativeBalanceEvent`] is emitted for
    /// reconciliation tooling.
    pub async fn refund(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        currency: &CurrencyCode,
        reference: &str,
    ) -> Result<RefundOutcome, LedgerError> {
        let amount = self.positive(amount)?;
        let converted = self.normalise(merchant_id, amount, currency).await?;
        let outcome = self.db.apply_refund(merchant_id, converted, reference).await?;
        if outcome.clamped() {
            warn!(
                "💼 Refund [{reference}] exceeded the funds held for merchant {merchant_id} by {}. \
                 Buckets were clamped to zero; the shortfall needs out-of-band reconciliation",
                outcome.shortfall
            );
            self.notify_negative_balance(merchant_id, outcome.shortfall, reference).await;
        }
        Ok(outcome)
    }

    /// Manual admin adjustment. Each supplied bucket becomes `max(0, bucket + delta)`.
    pub async fn admin_adjust(
        &self,
        merchant_id: &MerchantId,
        deltas: AdjustmentDeltas,
        reason: &str,
        admin_id: &str,
    ) -> Result<Balance, LedgerError> {
        if deltas.is_empty() {
            return Err(BalanceApiError::NoValidAdjustment.into());
        }
        let balance = self.db.adjust_buckets(merchant_id, &deltas, reason, admin_id).await?;
        info!("💼 Admin {admin_id} adjusted balance for merchant {merchant_id}: {reason}");
        Ok(balance)
    }

    /// The merchant's audit trail, oldest first.
    pub async fn movements(&self, merchant_id: &MerchantId) -> Result<Vec<BalanceMovement>, LedgerError> {
        let movements = self.db.fetch_movements(merchant_id).await?;
        Ok(movements)
    }

    /// One pass of the scheduled reserve release: every active merchant holding reserve gets
    /// `min(reserve, release_cap)` moved into available. A single merchant's failure is logged
    /// and counted, and the sweep carries on with the rest.
    pub async fn run_release_sweep(&self, reference: &str) -> Result<SweepResult, LedgerError> {
        let cap = self.release_cap().await?;
        if !cap.is_positive() {
            warn!("🕰️ The reserve release cap is not configured or zero. Nothing will be released");
            return Ok(SweepResult::default());
        }
        let merchants = self.db.active_merchants_with_reserve().await?;
        let mut result = SweepResult::default();
        for merchant_id in merchants {
            match self.release_for_sweep(&merchant_id, cap, reference).await {
                Ok(Some(released)) => {
                    result.merchants_processed += 1;
                    result.total_released += released;
                },
                Ok(None) => {},
                Err(e) => {
                    result.merchants_failed += 1;
                    error!("🕰️ Scheduled release failed for merchant {merchant_id}: {e}");
                },
            }
        }
        info!("🕰️ Sweep complete: {result}");
        Ok(result)
    }

    async fn release_for_sweep(
        &self,
        merchant_id: &MerchantId,
        cap: Money,
        reference: &str,
    ) -> Result<Option<Money>, LedgerError> {
        let balance = match self.db.fetch_balance(merchant_id).await? {
            Some(balance) => balance,
            None => return Ok(None),
        };
        if !balance.reserve.is_positive() {
            return Ok(None);
        }
        let amount = balance.reserve.min(cap);
        self.db.release_reserve(merchant_id, amount, reference).await?;
        for producer in &self.producers.reserve_released_producers {
            let event = ReserveReleasedEvent {
                merchant_id: merchant_id.clone(),
                amount,
                reference: reference.to_string(),
            };
            producer.publish_event(event).await;
        }
        Ok(Some(amount))
    }

    async fn release_cap(&self) -> Result<Money, LedgerError> {
        let settings = SettingsApi::new(self.db.clone());
        let cap = settings.get_money(keys::RESERVE_RELEASE_CAP).await?.unwrap_or(DEFAULT_RELEASE_CAP);
        Ok(cap)
    }

    /// Converts an incoming amount into the merchant's dashboard currency, using the merchant's
    /// configured spread (or the global default when there is none).
    async fn normalise(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        currency: &CurrencyCode,
    ) -> Result<Money, LedgerError> {
        let profile = self
            .db
            .fetch_merchant_profile(merchant_id)
            .await?
            .ok_or_else(|| BalanceApiError::MerchantNotFound(merchant_id.clone()))?;
        if currency == &profile.dashboard_currency {
            return Ok(amount);
        }
        let conversion = self
            .fx
            .convert(amount, currency, &profile.dashboard_currency, profile.fx_spread_percent)
            .await
            .map_err(LedgerError::Fx)?;
        Ok(conversion.converted)
    }

    async fn notify_negative_balance(&self, merchant_id: &MerchantId, shortfall: Money, reference: &str) {
        for producer in &self.producers.negative_balance_producers {
            let event =
                NegativeBalanceEvent::new(merchant_id.clone(), shortfall, reference.to_string());
            producer.publish_event(event).await;
        }
    }

    fn positive(&self, amount: Money) -> Result<Money, LedgerError> {
        if amount.is_positive() {
            Ok(amount)
        } else {
            Err(LedgerError::InvalidAmount(amount))
        }
    }
}
