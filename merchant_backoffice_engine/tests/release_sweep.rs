//! The scheduled reserve release sweep: caps, isolation of per-merchant failures, and status
//! filtering.
use merchant_backoffice_engine::{
    db_types::{CurrencyCode, MerchantStatus},
    events::EventProducers,
    reserve_worker::sweep_reference,
    BalanceApi,
};
use mbo_common::Money;

mod support;

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

#[tokio::test]
async fn the_sweep_releases_up_to_the_cap_per_merchant() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-small", "US", None).await;
    support::stage_merchant(&db, "m-large", "US", None).await;
    let api = BalanceApi::new(db, EventProducers::default());
    let usd = CurrencyCode::from("USD");

    api.credit_reserve(&"m-small".into(), money("100.00"), &usd, "sale").await.unwrap();
    // Well beyond the seeded 5000.00 cap.
    api.credit_reserve(&"m-large".into(), money("12000.00"), &usd, "sale").await.unwrap();

    let reference = sweep_reference(chrono::Utc::now().date_naive());
    let result = api.run_release_sweep(&reference).await.unwrap();
    assert_eq!(result.merchants_processed, 2);
    assert_eq!(result.merchants_failed, 0);
    assert_eq!(result.total_released, money("5100.00"));

    let small = api.balance(&"m-small".into()).await.unwrap();
    assert!(small.reserve.is_zero());
    assert_eq!(small.available, money("100.00"));

    let large = api.balance(&"m-large".into()).await.unwrap();
    assert_eq!(large.reserve, money("7000.00"));
    assert_eq!(large.available, money("5000.00"));

    // The next run keeps draining the remainder.
    let result = api.run_release_sweep("scheduled-release:next-day").await.unwrap();
    assert_eq!(result.total_released, money("5000.00"));
    let large = api.balance(&"m-large".into()).await.unwrap();
    assert_eq!(large.reserve, money("2000.00"));
}

#[tokio::test]
async fn one_merchants_failure_does_not_abort_the_sweep() {
    let db = support::new_test_db().await;
    // Ordered by merchant id, the failing merchant is processed first.
    support::stage_merchant(&db, "a-fail", "US", None).await;
    support::stage_merchant(&db, "b-ok", "US", None).await;
    let api = BalanceApi::new(db.clone(), EventProducers::default());
    let usd = CurrencyCode::from("USD");

    api.credit_reserve(&"a-fail".into(), money("40.00"), &usd, "sale").await.unwrap();
    api.credit_reserve(&"b-ok".into(), money("70.00"), &usd, "sale").await.unwrap();

    // Simulate a storage fault that only hits the first merchant's release.
    sqlx::query(
        r#"CREATE TRIGGER simulate_release_fault
           BEFORE UPDATE ON balances FOR EACH ROW
           WHEN OLD.merchant_id = 'a-fail'
           BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END"#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let result = api.run_release_sweep("scheduled-release:test").await.unwrap();
    assert_eq!(result.merchants_failed, 1);
    assert_eq!(result.merchants_processed, 1);
    assert_eq!(result.total_released, money("70.00"));

    let ok = api.balance(&"b-ok".into()).await.unwrap();
    assert!(ok.reserve.is_zero());
    assert_eq!(ok.available, money("70.00"));

    // The failed merchant's balance is untouched and eligible for the next run.
    sqlx::query("DROP TRIGGER simulate_release_fault").execute(db.pool()).await.unwrap();
    let failed = api.balance(&"a-fail".into()).await.unwrap();
    assert_eq!(failed.reserve, money("40.00"));
    let result = api.run_release_sweep("scheduled-release:retry").await.unwrap();
    assert_eq!(result.merchants_processed, 1);
    assert_eq!(result.total_released, money("40.00"));
}

#[tokio::test]
async fn only_active_merchants_with_reserve_are_swept() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-active", "US", None).await;
    support::stage_merchant_with_status(&db, "m-suspended", "US", None, MerchantStatus::Suspended).await;
    support::stage_merchant(&db, "m-empty", "US", None).await;
    let api = BalanceApi::new(db, EventProducers::default());
    let usd = CurrencyCode::from("USD");

    api.credit_reserve(&"m-active".into(), money("25.00"), &usd, "sale").await.unwrap();
    api.credit_reserve(&"m-suspended".into(), money("25.00"), &usd, "sale").await.unwrap();
    api.balance(&"m-empty".into()).await.unwrap();

    let result = api.run_release_sweep("scheduled-release:test").await.unwrap();
    assert_eq!(result.merchants_processed, 1);
    assert_eq!(result.total_released, money("25.00"));

    let suspended = api.balance(&"m-suspended".into()).await.unwrap();
    assert_eq!(suspended.reserve, money("25.00"));
    assert!(suspended.available.is_zero());
}
