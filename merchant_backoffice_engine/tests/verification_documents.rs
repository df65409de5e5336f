//! Verification document numbers are persisted encrypted and round-trip through the API.
use merchant_backoffice_engine::VerificationApi;
use mbo_common::FieldCipher;

mod support;

const CNPJ: &str = "12.345.678/0001-95";

#[tokio::test]
async fn documents_round_trip_and_only_ciphertext_is_stored() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-1", "Brazil", None).await;
    let api = VerificationApi::new(db.clone(), FieldCipher::new([3u8; 32]));
    let merchant = "m-1".into();

    api.store_document(&merchant, "tax_id", CNPJ).await.unwrap();
    assert_eq!(api.document(&merchant, "tax_id").await.unwrap().as_deref(), Some(CNPJ));
    assert_eq!(api.document(&merchant, "passport").await.unwrap(), None);

    // The raw row must hold versioned ciphertext, never the document number.
    let (stored,): (String,) =
        sqlx::query_as("SELECT number_ciphertext FROM verification_documents WHERE merchant_id = 'm-1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert!(stored.starts_with("v1:"));
    assert!(!stored.contains("12.345.678"));
}

#[tokio::test]
async fn storing_again_replaces_the_document() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-1", "Brazil", None).await;
    let api = VerificationApi::new(db, FieldCipher::new([3u8; 32]));
    let merchant = "m-1".into();

    api.store_document(&merchant, "tax_id", CNPJ).await.unwrap();
    api.store_document(&merchant, "tax_id", "98.765.432/0001-10").await.unwrap();
    assert_eq!(
        api.document(&merchant, "tax_id").await.unwrap().as_deref(),
        Some("98.765.432/0001-10")
    );
}

#[tokio::test]
async fn a_different_key_cannot_read_stored_documents() {
    let db = support::new_test_db().await;
    support::stage_merchant(&db, "m-1", "Brazil", None).await;
    let writer = VerificationApi::new(db.clone(), FieldCipher::new([3u8; 32]));
    writer.store_document(&"m-1".into(), "tax_id", CNPJ).await.unwrap();

    let reader = VerificationApi::new(db, FieldCipher::new([4u8; 32]));
    assert!(reader.document(&"m-1".into(), "tax_id").await.is_err());
}
