use sqlx::SqliteConnection;

use crate::{
    db_types::{MerchantId, MerchantProfile},
    traits::BalanceApiError,
};

const PROFILE_COLUMNS: &str = "id AS merchant_id, status, country, dashboard_currency, payout_currency, \
                               fx_spread_percent, sells_internationally";

pub async fn upsert_profile(profile: &MerchantProfile, conn: &mut SqliteConnection) -> Result<(), BalanceApiError> {
    sqlx::query(
        r#"INSERT INTO merchants (id, status, country, dashboard_currency, payout_currency, fx_spread_percent, sells_internationally)
           VALUES (?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT (id) DO UPDATE SET
               status = excluded.status,
               country = excluded.country,
               dashboard_currency = excluded.dashboard_currency,
               payout_currency = excluded.payout_currency,
               fx_spread_percent = excluded.fx_spread_percent,
               sells_internationally = excluded.sells_internationally,
               updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(&profile.merchant_id)
    .bind(profile.status)
    .bind(&profile.country)
    .bind(&profile.dashboard_currency)
    .bind(&profile.payout_currency)
    .bind(profile.fx_spread_percent)
    .bind(profile.sells_internationally)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_profile(
    merchant_id: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Option<MerchantProfile>, BalanceApiError> {
    let profile = sqlx::query_as::<_, MerchantProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM merchants WHERE id = ?"
    ))
    .bind(merchant_id)
    .fetch_optional(conn)
    .await?;
    Ok(profile)
}
