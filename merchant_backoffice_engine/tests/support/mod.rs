#![allow(dead_code)]

use std::path::Path;

use log::*;
use merchant_backoffice_engine::{
    db_types::{MerchantProfile, MerchantStatus},
    helpers::derive_currency_profile,
    traits::BalanceManagement,
    SettingsApi,
    SqliteDatabase,
};
use mbo_common::SpreadPercent;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/mbo_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
}

/// A fresh migrated database with the default settings seeded.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    SettingsApi::new(db.clone()).init_defaults().await.expect("Error seeding default settings");
    db
}

/// Stages an active merchant with currencies derived from the country.
pub async fn stage_merchant(db: &SqliteDatabase, id: &str, country: &str, spread: Option<SpreadPercent>) {
    stage_merchant_with_status(db, id, country, spread, MerchantStatus::Active).await
}

pub async fn stage_merchant_with_status(
    db: &SqliteDatabase,
    id: &str,
    country: &str,
    spread: Option<SpreadPercent>,
    status: MerchantStatus,
) {
    let currencies = derive_currency_profile(country, false);
    let profile = MerchantProfile {
        merchant_id: id.into(),
        status,
        country: country.to_string(),
        dashboard_currency: currencies.dashboard_currency,
        payout_currency: currencies.payout_currency,
        fx_spread_percent: spread,
        sells_internationally: false,
    };
    db.upsert_merchant_profile(&profile).await.expect("Error staging merchant");
}
