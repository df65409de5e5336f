//! Encrypted access to verification document numbers.

use std::fmt::Debug;

use log::debug;
use mbo_common::FieldCipher;

use crate::{
    db_types::MerchantId,
    traits::{VerificationError, VerificationStore},
};

/// `VerificationApi` encrypts document numbers on write and decrypts on read, so the backing
/// store only ever holds ciphertext.
pub struct VerificationApi<B> {
    db: B,
    cipher: FieldCipher,
}

impl<B> Debug for VerificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi")
    }
}

impl<B> VerificationApi<B>
where B: VerificationStore
{
    pub fn new(db: B, cipher: FieldCipher) -> Self {
        Self { db, cipher }
    }

    pub async fn store_document(
        &self,
        merchant_id: &MerchantId,
        kind: &str,
        number: &str,
    ) -> Result<(), VerificationError> {
        let ciphertext = self.cipher.encrypt(number)?;
        self.db.upsert_document(merchant_id, kind, &ciphertext).await?;
        debug!("🛂 Stored {kind} document for merchant {merchant_id}");
        Ok(())
    }

    /// The decrypted document number, or `None` when nothing is stored for the kind.
    pub async fn document(&self, merchant_id: &MerchantId, kind: &str) -> Result<Option<String>, VerificationError> {
        match self.db.fetch_document(merchant_id, kind).await? {
            Some(document) => Ok(Some(self.cipher.decrypt(&document.number_ciphertext)?)),
            None => Ok(None),
        }
    }
}
