use log::{debug, trace};
use mbo_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{
        AdjustmentDeltas,
        Balance,
        BalanceMovement,
        MerchantId,
        MovementOperation,
        RefundOutcome,
    },
    sqlite::db::merchants,
    traits::BalanceApiError,
};

const BALANCE_COLUMNS: &str =
    "merchant_id, dashboard_currency, reserve, available, pending, created_at, updated_at";

pub async fn fetch_balance(
    merchant_id: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Option<Balance>, BalanceApiError> {
    let balance = sqlx::query_as::<_, Balance>(&format!(
        "SELECT {BALANCE_COLUMNS} FROM balances WHERE merchant_id = ?"
    ))
    .bind(merchant_id)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}

/// Creates a zeroed balance in the merchant's dashboard currency if none exists. The insert is
/// `OR IGNORE`, so concurrent callers settle on a single record.
pub async fn ensure_balance(
    merchant_id: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Balance, BalanceApiError> {
    let profile = merchants::fetch_profile(merchant_id, &mut *conn)
        .await?
        .ok_or_else(|| BalanceApiError::MerchantNotFound(merchant_id.clone()))?;
    let result = sqlx::query("INSERT OR IGNORE INTO balances (merchant_id, dashboard_currency) VALUES (?, ?)")
        .bind(merchant_id)
        .bind(&profile.dashboard_currency)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!("💼 Created {} balance for merchant {merchant_id}", profile.dashboard_currency);
    }
    fetch_balance(merchant_id, conn)
        .await?
        .ok_or_else(|| BalanceApiError::BalanceNotFound(merchant_id.clone()))
}

pub async fn credit_reserve(
    merchant_id: &MerchantId,
    amount: Money,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Balance, BalanceApiError> {
    let balance = sqlx::query_as::<_, Balance>(&format!(
        r#"UPDATE balances SET
           reserve = reserve + ?1,
           updated_at = CURRENT_TIMESTAMP
           WHERE merchant_id = ?2
           RETURNING {BALANCE_COLUMNS}"#
    ))
    .bind(amount)
    .bind(merchant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| BalanceApiError::BalanceNotFound(merchant_id.clone()))?;
    insert_movement(
        merchant_id,
        MovementOperation::CreditReserve,
        amount,
        Money::ZERO,
        Money::ZERO,
        reference,
        None,
        conn,
    )
    .await?;
    trace!("💼 {amount} credited to reserve for merchant {merchant_id} [{reference}]");
    Ok(balance)
}

/// Reserve-to-available move, guarded so the reserve can never go negative. Zero rows affected
/// means either the balance is missing or the reserve is short; the follow-up read tells the
/// two apart.
pub async fn release_reserve(
    merchant_id: &MerchantId,
    amount: Money,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Balance, BalanceApiError> {
    let updated = sqlx::query_as::<_, Balance>(&format!(
        r#"UPDATE balances SET
           reserve = reserve - ?1,
           available = available + ?1,
           updated_at = CURRENT_TIMESTAMP
           WHERE merchant_id = ?2 AND reserve >= ?1
           RETURNING {BALANCE_COLUMNS}"#
    ))
    .bind(amount)
    .bind(merchant_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(balance) => {
            insert_movement(
                merchant_id,
                MovementOperation::ReleaseReserve,
                -amount,
                amount,
                Money::ZERO,
                reference,
                None,
                conn,
            )
            .await?;
            trace!("💼 {amount} released to available for merchant {merchant_id} [{reference}]");
            Ok(balance)
        },
        None => match fetch_balance(merchant_id, conn).await? {
            None => Err(BalanceApiError::BalanceNotFound(merchant_id.clone())),
            Some(balance) => {
                Err(BalanceApiError::InsufficientReserve { requested: amount, held: balance.reserve })
            },
        },
    }
}

pub async fn debit_available(
    merchant_id: &MerchantId,
    amount: Money,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Balance, BalanceApiError> {
    let updated = sqlx::query_as::<_, Balance>(&format!(
        r#"UPDATE balances SET
           available = available - ?1,
           updated_at = CURRENT_TIMESTAMP
           WHERE merchant_id = ?2 AND available >= ?1
           RETURNING {BALANCE_COLUMNS}"#
    ))
    .bind(amount)
    .bind(merchant_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(balance) => {
            insert_movement(
                merchant_id,
                MovementOperation::DebitAvailable,
                Money::ZERO,
                -amount,
                Money::ZERO,
                reference,
                None,
                conn,
            )
            .await?;
            trace!("💼 {amount} debited from available for merchant {merchant_id} [{reference}]");
            Ok(balance)
        },
        None => match fetch_balance(merchant_id, conn).await? {
            None => Err(BalanceApiError::BalanceNotFound(merchant_id.clone())),
            Some(balance) => {
                Err(BalanceApiError::InsufficientAvailable { requested: amount, held: balance.available })
            },
        },
    }
}

/// Refund deduction: reserve first, remainder from available, both clamped at zero. The
/// read-compute-write sequence relies on the caller running it inside a single transaction.
pub async fn apply_refund(
    merchant_id: &MerchantId,
    amount: Money,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<RefundOutcome, BalanceApiError> {
    let before = fetch_balance(merchant_id, &mut *conn)
        .await?
        .ok_or_else(|| BalanceApiError::BalanceNotFound(merchant_id.clone()))?;
    let from_reserve = before.reserve.min(amount);
    let remainder = amount - from_reserve;
    let from_available = before.available.min(remainder);
    let shortfall = remainder - from_available;
    let balance = sqlx::query_as::<_, Balance>(&format!(
        r#"UPDATE balances SET
           reserve = ?1,
           available = ?2,
           updated_at = CURRENT_TIMESTAMP
           WHERE merchant_id = ?3
           RETURNING {BALANCE_COLUMNS}"#
    ))
    .bind(before.reserve - from_reserve)
    .bind(before.available - from_available)
    .bind(merchant_id)
    .fetch_one(&mut *conn)
    .await?;
    insert_movement(
        merchant_id,
        MovementOperation::Refund,
        -from_reserve,
        -from_available,
        Money::ZERO,
        reference,
        None,
        conn,
    )
    .await?;
    debug!(
        "💼 Refund of {amount} applied for merchant {merchant_id}: {from_reserve} from reserve, \
         {from_available} from available, {shortfall} uncovered [{reference}]"
    );
    Ok(RefundOutcome { balance, from_reserve, from_available, shortfall })
}

/// Manual adjustment: every supplied bucket becomes `max(0, bucket + delta)`. The movement row
/// records the applied (post-clamp) deltas.
pub async fn adjust_buckets(
    merchant_id: &MerchantId,
    deltas: &AdjustmentDeltas,
    reason: &str,
    admin_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Balance, BalanceApiError> {
    let before = fetch_balance(merchant_id, &mut *conn)
        .await?
        .ok_or_else(|| BalanceApiError::BalanceNotFound(merchant_id.clone()))?;
    let clamp = |current: Money, delta: Option<Money>| match delta {
        Some(delta) => (current + delta).max(Money::ZERO),
        None => current,
    };
    let new_reserve = clamp(before.reserve, deltas.reserve);
    let new_available = clamp(before.available, deltas.available);
    let new_pending = clamp(before.pending, deltas.pending);
    let balance = sqlx::query_as::<_, Balance>(&format!(
        r#"UPDATE balances SET
           reserve = ?1,
           available = ?2,
           pending = ?3,
           updated_at = CURRENT_TIMESTAMP
           WHERE merchant_id = ?4
           RETURNING {BALANCE_COLUMNS}"#
    ))
    .bind(new_reserve)
    .bind(new_available)
    .bind(new_pending)
    .bind(merchant_id)
    .fetch_one(&mut *conn)
    .await?;
    insert_movement(
        merchant_id,
        MovementOperation::AdminAdjust,
        balance.reserve - before.reserve,
        balance.available - before.available,
        balance.pending - before.pending,
        reason,
        Some(admin_id),
        conn,
    )
    .await?;
    Ok(balance)
}

pub async fn active_merchants_with_reserve(
    conn: &mut SqliteConnection,
) -> Result<Vec<MerchantId>, BalanceApiError> {
    let rows = sqlx::query_as::<_, (MerchantId,)>(
        r#"SELECT b.merchant_id FROM balances b
           INNER JOIN merchants m ON m.id = b.merchant_id
           WHERE m.status = 'Active' AND b.reserve > 0
           ORDER BY b.merchant_id"#,
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn fetch_movements(
    merchant_id: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Vec<BalanceMovement>, BalanceApiError> {
    let movements = sqlx::query_as::<_, BalanceMovement>(
        r#"SELECT id, merchant_id, operation, reserve_delta, available_delta, pending_delta,
                  reference, actor, created_at
           FROM balance_movements WHERE merchant_id = ? ORDER BY id"#,
    )
    .bind(merchant_id)
    .fetch_all(conn)
    .await?;
    Ok(movements)
}

#[allow(clippy::too_many_arguments)]
async fn insert_movement(
    merchant_id: &MerchantId,
    operation: MovementOperation,
    reserve_delta: Money,
    available_delta: Money,
    pending_delta: Money,
    reference: &str,
    actor: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), BalanceApiError> {
    sqlx::query(
        r#"INSERT INTO balance_movements
           (merchant_id, operation, reserve_delta, available_delta, pending_delta, reference, actor)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(merchant_id)
    .bind(operation)
    .bind(reserve_delta)
    .bind(available_delta)
    .bind(pending_delta)
    .bind(reference)
    .bind(actor)
    .execute(conn)
    .await?;
    Ok(())
}
