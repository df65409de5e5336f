use mbo_common::Money;
use thiserror::Error;

use crate::db_types::{
    AdjustmentDeltas,
    Balance,
    BalanceMovement,
    MerchantId,
    MerchantProfile,
    RefundOutcome,
};

#[derive(Debug, Clone, Error)]
pub enum BalanceApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Concurrent mutation conflict on the balance record: {0}")]
    WriteConflict(String),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(MerchantId),
    #[error("No balance record exists for merchant {0}")]
    BalanceNotFound(MerchantId),
    #[error("Insufficient reserve funds: requested {requested}, held {held}")]
    InsufficientReserve { requested: Money, held: Money },
    #[error("Insufficient available funds: requested {requested}, held {held}")]
    InsufficientAvailable { requested: Money, held: Money },
    #[error("An adjustment must supply a delta for at least one bucket")]
    NoValidAdjustment,
}

impl From<sqlx::Error> for BalanceApiError {
    fn from(e: sqlx::Error) -> Self {
        if super::is_write_conflict(&e) {
            BalanceApiError::WriteConflict(e.to_string())
        } else {
            BalanceApiError::DatabaseError(e.to_string())
        }
    }
}

impl BalanceApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BalanceApiError::WriteConflict(_))
    }
}

/// The `BalanceManagement` trait defines the behaviour of the authoritative balance store.
///
/// A balance is one record per merchant holding the reserve, available and pending buckets in
/// the merchant's dashboard currency. Records are created lazily on first access and never
/// deleted while the merchant exists.
///
/// Implementations must serialise mutations per merchant: two concurrent mutations on the same
/// balance may never both read the pre-mutation state and commit conflicting post-mutation
/// states. Amounts passed to the mutation methods are already denominated in the merchant's
/// dashboard currency; FX normalisation happens in the API layer above.
#[allow(async_fn_in_trait)]
pub trait BalanceManagement {
    /// Writes the merchant profile read model. Called by the upstream profile sync, and by
    /// tests to stage merchants.
    fn upsert_merchant_profile(&self, profile: &MerchantProfile) -> impl ::std::future::Future<Output = Result<(), BalanceApiError>> + Send;

    fn fetch_merchant_profile(&self, merchant_id: &MerchantId) -> impl ::std::future::Future<Output = Result<Option<MerchantProfile>, BalanceApiError>> + Send;

    /// Fetches the balance for the given merchant, or `None` if it has not been created yet.
    fn fetch_balance(&self, merchant_id: &MerchantId) -> impl ::std::future::Future<Output = Result<Option<Balance>, BalanceApiError>> + Send;

    /// Creates a zeroed balance in the merchant's dashboard currency if none exists yet.
    /// Idempotent; concurrent calls settle on exactly one record.
    fn ensure_balance(&self, merchant_id: &MerchantId) -> impl ::std::future::Future<Output = Result<Balance, BalanceApiError>> + Send;

    /// Adds `amount` to the reserve bucket.
    fn credit_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> impl ::std::future::Future<Output = Result<Balance, BalanceApiError>> + Send;

    /// Moves `amount` from reserve to available. `reserve + available` is conserved. Fails with
    /// [`BalanceApiError::InsufficientReserve`] when the reserve does not cover the amount.
    fn release_reserve(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> impl ::std::future::Future<Output = Result<Balance, BalanceApiError>> + Send;

    /// Removes `amount` from the available bucket. Fails with
    /// [`BalanceApiError::InsufficientAvailable`] when available does not cover the amount.
    fn debit_available(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> impl ::std::future::Future<Output = Result<Balance, BalanceApiError>> + Send;

    /// Deducts a refund, draining reserve first and taking any remainder from available.
    /// Never fails on a shortfall: buckets are clamped at zero and the uncovered part is
    /// reported in the outcome for reconciliation.
    fn apply_refund(
        &self,
        merchant_id: &MerchantId,
        amount: Money,
        reference: &str,
    ) -> impl ::std::future::Future<Output = Result<RefundOutcome, BalanceApiError>> + Send;

    /// Applies a manual adjustment: each supplied bucket becomes `max(0, bucket + delta)`.
    fn adjust_buckets(
        &self,
        merchant_id: &MerchantId,
        deltas: &AdjustmentDeltas,
        reason: &str,
        admin_id: &str,
    ) -> impl ::std::future::Future<Output = Result<Balance, BalanceApiError>> + Send;

    /// Merchants in `Active` status whose reserve bucket holds funds, ordered by merchant id.
    fn active_merchants_with_reserve(&self) -> impl ::std::future::Future<Output = Result<Vec<MerchantId>, BalanceApiError>> + Send;

    /// The audit trail for a merchant, oldest first.
    fn fetch_movements(&self, merchant_id: &MerchantId) -> impl ::std::future::Future<Output = Result<Vec<BalanceMovement>, BalanceApiError>> + Send;
}
