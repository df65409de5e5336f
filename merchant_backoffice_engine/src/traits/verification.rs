use mbo_common::CipherError;
use thiserror::Error;

use crate::db_types::{MerchantId, VerificationDocument};

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Field encryption failed: {0}")]
    Cipher(#[from] CipherError),
}

impl From<sqlx::Error> for VerificationError {
    fn from(e: sqlx::Error) -> Self {
        VerificationError::DatabaseError(e.to_string())
    }
}

/// Storage for verification document numbers. Values arrive already encrypted; the store never
/// sees plaintext.
#[allow(async_fn_in_trait)]
pub trait VerificationStore {
    async fn upsert_document(
        &self,
        merchant_id: &MerchantId,
        kind: &str,
        ciphertext: &str,
    ) -> Result<(), VerificationError>;

    async fn fetch_document(
        &self,
        merchant_id: &MerchantId,
        kind: &str,
    ) -> Result<Option<VerificationDocument>, VerificationError>;
}
