//! Concurrency: simultaneous mutations of the same balance must all land, with no lost
//! updates, and the create-if-absent path must settle on a single record.
use merchant_backoffice_engine::{
    db_types::{CurrencyCode, MovementOperation},
    events::EventProducers,
    BalanceApi,
};
use mbo_common::Money;

mod support;

const NUM_CREDITS: i64 = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_credits_all_apply() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-burst", "US", None).await;

    let mut tasks = Vec::with_capacity(NUM_CREDITS as usize);
    for i in 0..NUM_CREDITS {
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            let api = BalanceApi::new(db, EventProducers::default());
            // Note: no up-front ensure call; the first writers race on balance creation too.
            api.credit_reserve(
                &"m-burst".into(),
                Money::from_major_units(10),
                &CurrencyCode::from("USD"),
                &format!("burst-sale-{i}"),
            )
            .await
            .expect("Error crediting reserve")
        }));
    }
    for task in tasks {
        task.await.expect("Credit task panicked");
    }

    let api = BalanceApi::new(db, EventProducers::default());
    let balance = api.balance(&"m-burst".into()).await.unwrap();
    assert_eq!(balance.reserve, Money::from_major_units(10 * NUM_CREDITS));

    let movements = api.movements(&"m-burst".into()).await.unwrap();
    let credits =
        movements.iter().filter(|m| m.operation == MovementOperation::CreditReserve).count();
    assert_eq!(credits, NUM_CREDITS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_releases_never_overdraw_the_reserve() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-race", "US", None).await;
    let api = BalanceApi::new(db.clone(), EventProducers::default());
    api.credit_reserve(&"m-race".into(), Money::from_major_units(50), &CurrencyCode::from("USD"), "seed")
        .await
        .unwrap();

    // Ten tasks each try to release 10.00 from a 50.00 reserve: exactly five can win.
    let mut tasks = Vec::new();
    for i in 0..10 {
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            let api = BalanceApi::new(db, EventProducers::default());
            api.release_reserve(&"m-race".into(), Money::from_major_units(10), &format!("race-{i}"))
                .await
                .is_ok()
        }));
    }
    let mut won = 0;
    for task in tasks {
        if task.await.expect("Release task panicked") {
            won += 1;
        }
    }

    assert_eq!(won, 5);
    let balance = api.balance(&"m-race".into()).await.unwrap();
    assert!(balance.reserve.is_zero());
    assert_eq!(balance.available, Money::from_major_units(50));
}
