//! The keyed configuration registry: idempotent seeding, typed validation, no ad-hoc keys.
use merchant_backoffice_engine::{setting_keys as keys, traits::SettingsError, SettingsApi};
use rust_decimal_macros::dec;

mod support;

#[tokio::test]
async fn defaults_are_seeded_once_and_only_if_missing() {
    let db = support::new_test_db().await;
    let settings = SettingsApi::new(db);

    // new_test_db already seeded; a second pass must be a no-op.
    let seeded_again = settings.init_defaults().await.unwrap();
    assert_eq!(seeded_again, 0);

    assert_eq!(settings.get_decimal(keys::FX_DEFAULT_SPREAD_PERCENT).await.unwrap(), Some(dec!(2.5)));
    assert_eq!(settings.get_bool(keys::FX_AUTO_REFRESH_ENABLED).await.unwrap(), Some(false));
    assert_eq!(settings.get_int(keys::RESERVE_RELEASE_HOUR_UTC).await.unwrap(), Some(6));
    assert_eq!(settings.get_money(keys::RESERVE_RELEASE_CAP).await.unwrap(), Some("5000.00".parse().unwrap()));
}

#[tokio::test]
async fn seeding_does_not_overwrite_admin_changes() {
    let db = support::new_test_db().await;
    let settings = SettingsApi::new(db);

    settings.set(keys::RESERVE_RELEASE_HOUR_UTC, "9", "admin-2").await.unwrap();
    settings.init_defaults().await.unwrap();
    assert_eq!(settings.get_int(keys::RESERVE_RELEASE_HOUR_UTC).await.unwrap(), Some(9));
}

#[tokio::test]
async fn the_setter_rejects_keys_that_were_never_seeded() {
    let db = support::new_test_db().await;
    let settings = SettingsApi::new(db);

    let result = settings.set("made.up.key", "whatever", "admin-2").await;
    assert!(matches!(result, Err(SettingsError::UnknownKey(_))));
}

#[tokio::test]
async fn values_are_validated_against_the_declared_type() {
    let db = support::new_test_db().await;
    let settings = SettingsApi::new(db);

    assert!(matches!(
        settings.set(keys::RESERVE_RELEASE_HOUR_UTC, "noon", "admin-2").await,
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        settings.set(keys::SUPPORTED_CURRENCIES, "not json", "admin-2").await,
        Err(SettingsError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn spreads_outside_zero_to_ten_are_rejected_at_the_boundary() {
    let db = support::new_test_db().await;
    let settings = SettingsApi::new(db);

    for bad in ["10.5", "-1", "200"] {
        assert!(matches!(
            settings.set(keys::FX_DEFAULT_SPREAD_PERCENT, bad, "admin-2").await,
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    let updated = settings.set(keys::FX_DEFAULT_SPREAD_PERCENT, "3.75", "admin-2").await.unwrap();
    assert_eq!(updated.value, "3.75");
    assert_eq!(updated.updated_by, "admin-2");
    assert_eq!(settings.get_decimal(keys::FX_DEFAULT_SPREAD_PERCENT).await.unwrap(), Some(dec!(3.75)));
}
