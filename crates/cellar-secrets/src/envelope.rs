//! Envelope encryption with single-use KMS data keys
//!
//! Bundle layout, byte-compatible with previously stored secrets:
//!
//! ```text
//! +----------------------+--------------------+------------------------+
//! | u32 BE key length N  | N bytes: encrypted | AES-256-GCM ciphertext |
//! |                      | data key           | || 16-byte tag         |
//! +----------------------+--------------------+------------------------+
//! ```
//!
//! The AEAD associated data is the key ID reported by KMS, binding the
//! ciphertext to the master key version that issued the data key. The
//! encryption context is bound through KMS itself.

use crate::aead;
use crate::context::EncryptionContext;
use crate::error::{Error, KmsError, Result};
use crate::kms::{KeyManagement, DATA_KEY_SIZE};
use std::sync::Arc;
use tracing::debug;

/// Size of the big-endian length prefix
const LENGTH_PREFIX_SIZE: usize = 4;

/// Seals and opens secrets with fresh data keys
#[derive(Clone)]
pub struct Envelope {
    kms: Arc<dyn KeyManagement>,
}

impl Envelope {
    pub fn new(kms: Arc<dyn KeyManagement>) -> Self {
        Self { kms }
    }

    /// Encrypt `plaintext` under a new data key issued by `key_id` for `context`
    pub async fn seal(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        // Dropping `key` wipes the plaintext data key on every path out of here
        let key = self
            .kms
            .generate_data_key(key_id, context, DATA_KEY_SIZE)
            .await
            .map_err(Error::KeyGeneration)?;

        let ciphertext = aead::seal(&key.plaintext, plaintext, key.key_id.as_bytes())?;
        let bundle = join(&key.ciphertext, &ciphertext)?;

        debug!(
            "Sealed {} bytes under {} ({} byte bundle)",
            plaintext.len(),
            key.key_id,
            bundle.len()
        );
        Ok(bundle)
    }

    /// Decrypt a bundle produced by [`Envelope::seal`] with the same `context`
    pub async fn open(&self, context: &EncryptionContext, bundle: &[u8]) -> Result<Vec<u8>> {
        let (encrypted_key, ciphertext) = split(bundle)?;

        let key = self
            .kms
            .decrypt(encrypted_key, context)
            .await
            .map_err(|e| match e {
                KmsError::InvalidCiphertext(_) => Error::DataKeyDecryption(e),
                KmsError::Service(_) => Error::KeyManagement(e),
            })?;

        aead::open(&key.plaintext, ciphertext, key.key_id.as_bytes())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope").finish_non_exhaustive()
    }
}

/// Frame an encrypted data key and its ciphertext into one bundle
pub fn join(encrypted_key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let key_len = u32::try_from(encrypted_key.len()).map_err(|_| {
        Error::malformed_ciphertext(format!(
            "encrypted data key of {} bytes does not fit the length prefix",
            encrypted_key.len()
        ))
    })?;

    let mut bundle =
        Vec::with_capacity(LENGTH_PREFIX_SIZE + encrypted_key.len() + ciphertext.len());
    bundle.extend_from_slice(&key_len.to_be_bytes());
    bundle.extend_from_slice(encrypted_key);
    bundle.extend_from_slice(ciphertext);
    Ok(bundle)
}

/// Split a bundle into `(encrypted data key, ciphertext)`
pub fn split(bundle: &[u8]) -> Result<(&[u8], &[u8])> {
    let (prefix, rest) = bundle
        .split_first_chunk::<LENGTH_PREFIX_SIZE>()
        .ok_or_else(|| {
            Error::malformed_ciphertext(format!(
                "bundle is {} bytes, too short for a length prefix",
                bundle.len()
            ))
        })?;

    let key_len = u32::from_be_bytes(*prefix) as usize;
    if key_len > rest.len() {
        return Err(Error::malformed_ciphertext(format!(
            "encrypted data key length {} exceeds remaining {} bytes",
            key_len,
            rest.len()
        )));
    }

    Ok(rest.split_at(key_len))
}
