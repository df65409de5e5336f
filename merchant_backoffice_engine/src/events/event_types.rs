use chrono::{DateTime, Utc};
use mbo_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::MerchantId;

/// Emitted when a refund exceeded the funds held for a merchant and the buckets were clamped
/// to zero. `shortfall` is the uncovered part, flagged for out-of-band reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeBalanceEvent {
    pub merchant_id: MerchantId,
    pub shortfall: Money,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

impl NegativeBalanceEvent {
    pub fn new(merchant_id: MerchantId, shortfall: Money, reference: String) -> Self {
        Self { merchant_id, shortfall, reference, occurred_at: Utc::now() }
    }
}

/// Emitted for each merchant whose reserve was moved to available by the scheduled sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveReleasedEvent {
    pub merchant_id: MerchantId,
    pub amount: Money,
    pub reference: String,
}
