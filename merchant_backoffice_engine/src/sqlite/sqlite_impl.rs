//! `SqliteDatabase` is a concrete implementation of a merchant back-office storage backend.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the [`crate::traits`]
//! module. Every mutation runs as a single transaction, and transactions that lose a lock race
//! are retried a bounded number of times before the conflict is surfaced to the caller.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use mbo_common::{Money, Rate};
use sqlx::SqlitePool;

use super::{db, retry_write};
use crate::{
    db_types::{
        AdjustmentDeltas,
        Balance,
        BalanceMovement,
        CurrencyCode,
        FxRateSnapshot,
        MerchantId,
        MerchantProfile,
        RateSource,
        RefundOutcome,
        Setting,
        VerificationDocument,
    },
    traits::{
        BalanceApiError,
        BalanceManagement,
        ExchangeRateError,
        ExchangeRates,
        SettingsError,
        SettingsManagement,
        VerificationError,
        VerificationStore,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, reading the URL from `MBO_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db::db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = db::new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl BalanceManagement for SqliteDatabase {
    async fn upsert_merchant_profile(&self, profile: &MerchantProfile) -> Result<(), BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        db::merchants::upsert_profile(profile, &mut conn).await
    }

    async fn fetch_merchant_profile(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<MerchantProfile>, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        db::merchants::fetch_profile(merchant_id, &mut conn).await
    }

    async fn fetch_balance(&self, merchant_id: &MerchantId) -> Result<Option<Balance>, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        db::balances::fetch_balance(merchant_id, &mut conn).await
    }

    async fn ensure_balance(&self, merchant_id: &MerchantId) -> Result<Balance, BalanceApiError> {
        retry_write!("ensure_balance", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            let balance = db::balances::ensure_balance(merchant_id, &mut tx).await?;
            tx.commit().await?;
            Ok(balance)
        })
    }

    async fn credit_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<Balance, BalanceApiError> {
        retry_write!("credit_reserve", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            db::balances::ensure_balance(merchant_id, &mut tx).await?;
            let balance = db::balances::credit_reserve(merchant_id, amount, reference, &mut tx).await?;
            tx.commit().await?;
            Ok(balance)
        })
    }

    async fn release_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<Balance, BalanceApiError> {
        retry_write!("release_reserve", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            db::balances::ensure_balance(merchant_id, &mut tx).await?;
            let balance = db::balances::release_reserve(merchant_id, amount, reference, &mut tx).await?;
            tx.commit().await?;
            Ok(balance)
        })
    }

    async fn debit_available(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<Balance, BalanceApiError> {
        retry_write!("debit_available", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            db::balances::ensure_balance(merchant_id, &mut tx).await?;
            let balance = db::balances::debit_available(merchant_id, amount, reference, &mut tx).await?;
            tx.commit().await?;
            Ok(balance)
        })
    }

    async fn apply_refund(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> Result<RefundOutcome, BalanceApiError> {
        retry_write!("apply_refund", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            db::balances::ensure_balance(merchant_id, &mut tx).await?;
            let outcome = db::balances::apply_refund(merchant_id, amount, reference, &mut tx).await?;
            tx.commit().await?;
            Ok(outcome)
        })
    }

    async fn adjust_buckets(
        &self,
        merchant_id: &MerchantId,
        deltas: &AdjustmentDeltas,
        reason: &str,
        admin_id: &str,
    ) -> Result<Balance, BalanceApiError> {
        if deltas.is_empty() {
            return Err(BalanceApiError::NoValidAdjustment);
        }
        retry_write!("adjust_buckets", BalanceApiError, {
            let mut tx = self.pool.begin().await?;
            db::balances::ensure_balance(merchant_id, &mut tx).await?;
            let balance = db::balances::adjust_buckets(merchant_id, deltas, reason, admin_id, &mut tx).await?;
            tx.commit().await?;
            Ok(balance)
        })
    }

    async fn active_merchants_with_reserve(&self) -> Result<Vec<MerchantId>, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        db::balances::active_merchants_with_reserve(&mut conn).await
    }

    async fn fetch_movements(&self, merchant_id: &MerchantId) -> Result<Vec<BalanceMovement>, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        db::balances::fetch_movements(merchant_id, &mut conn).await
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_current_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<FxRateSnapshot, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        db::exchange_rates::fetch_current_rate(base, quote, &mut conn).await
    }

    async fn fetch_rate_at(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<FxRateSnapshot, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        db::exchange_rates::fetch_rate_at(base, quote, at, &mut conn).await
    }

    async fn insert_rate_snapshot(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        rate: Rate,
        source: RateSource,
    ) -> Result<FxRateSnapshot, ExchangeRateError> {
        if !rate.is_positive() {
            return Err(ExchangeRateError::InvalidRate(rate));
        }
        retry_write!("insert_rate_snapshot", ExchangeRateError, {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;
            db::exchange_rates::close_open_snapshot(base, quote, now, &mut tx).await?;
            let snapshot = db::exchange_rates::insert_open_snapshot(base, quote, rate, source, now, &mut tx).await?;
            tx.commit().await?;
            Ok(snapshot)
        })
    }

    async fn fetch_rate_history(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
    ) -> Result<Vec<FxRateSnapshot>, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        db::exchange_rates::fetch_history(base, quote, &mut conn).await
    }
}

impl SettingsManagement for SqliteDatabase {
    async fn fetch_setting(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        db::settings::fetch_setting(key, &mut conn).await
    }

    async fn update_setting(&self, key: &str, value: &str, updated_by: &str) -> Result<Setting, SettingsError> {
        retry_write!("update_setting", SettingsError, {
            let mut conn = self.pool.acquire().await?;
            db::settings::update_setting(key, value, updated_by, &mut conn).await
        })
    }

    async fn seed_settings(&self, defaults: &[Setting]) -> Result<usize, SettingsError> {
        retry_write!("seed_settings", SettingsError, {
            let mut tx = self.pool.begin().await?;
            let seeded = db::settings::seed_settings(defaults, &mut tx).await?;
            tx.commit().await?;
            Ok(seeded)
        })
    }
}

impl VerificationStore for SqliteDatabase {
    async fn upsert_document(
        &self,
        merchant_id: &MerchantId,
        kind: &str,
        ciphertext: &str,
    ) -> Result<(), VerificationError> {
        let mut conn = self.pool.acquire().await?;
        db::verification::upsert_document(merchant_id, kind, ciphertext, &mut conn).await
    }

    async fn fetch_document(
        &self,
        merchant_id: &MerchantId,
        kind: &str,
    ) -> Result<Option<VerificationDocument>, VerificationError> {
        let mut conn = self.pool.acquire().await?;
        db::verification::fetch_document(merchant_id, kind, &mut conn).await
    }
}
