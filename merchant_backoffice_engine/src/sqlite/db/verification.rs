use sqlx::SqliteConnection;

use crate::{
    db_types::{MerchantId, VerificationDocument},
    traits::VerificationError,
};

pub async fn upsert_document(
    merchant_id: &MerchantId,
    kind: &str,
    ciphertext: &str,
    conn: &mut SqliteConnection,
) -> Result<(), VerificationError> {
    sqlx::query(
        r#"INSERT INTO verification_documents (merchant_id, kind, number_ciphertext)
           VALUES (?, ?, ?)
           ON CONFLICT (merchant_id, kind) DO UPDATE SET
               number_ciphertext = excluded.number_ciphertext,
               updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(merchant_id)
    .bind(kind)
    .bind(ciphertext)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_document(
    merchant_id: &MerchantId,
    kind: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<VerificationDocument>, VerificationError> {
    let document = sqlx::query_as::<_, VerificationDocument>(
        r#"SELECT merchant_id, kind, number_ciphertext, created_at, updated_at
           FROM verification_documents WHERE merchant_id = ? AND kind = ?"#,
    )
    .bind(merchant_id)
    .bind(kind)
    .fetch_optional(conn)
    .await?;
    Ok(document)
}
