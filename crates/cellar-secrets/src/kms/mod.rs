//! Key management collaborator
//!
//! The envelope only needs two capabilities from a KMS: issue a fresh data
//! key under a master key, and decrypt a previously issued encrypted data key.
//! [`aws::AwsKms`] binds these to AWS KMS; [`fake::FakeKms`] is an in-memory
//! stand-in for tests.

pub mod aws;
pub mod fake;

use crate::context::EncryptionContext;
use crate::error::KmsError;
use async_trait::async_trait;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use aws::AwsKms;
pub use fake::FakeKms;

/// Size of every data key requested by the envelope (AES-256)
pub const DATA_KEY_SIZE: usize = 32;

/// A freshly issued data key
///
/// The plaintext half is wiped when the value is dropped, on every exit path.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    /// Plaintext key material, used for exactly one seal
    pub plaintext: Vec<u8>,
    /// The same key encrypted under the master key; stored with the ciphertext
    #[zeroize(skip)]
    pub ciphertext: Vec<u8>,
    /// Master key version that issued this data key
    #[zeroize(skip)]
    pub key_id: String,
}

/// A data key recovered from its encrypted form
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DecryptedKey {
    /// Plaintext key material
    pub plaintext: Vec<u8>,
    /// Master key version that had issued the data key
    #[zeroize(skip)]
    pub key_id: String,
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataKey")
            .field("plaintext", &"[REDACTED]")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl fmt::Debug for DecryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedKey")
            .field("plaintext", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// The subset of a key management service the envelope depends on
#[async_trait]
pub trait KeyManagement: Send + Sync {
    /// Generate a data key of `num_bytes` under `key_id`, bound to `context`
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        num_bytes: usize,
    ) -> Result<DataKey, KmsError>;

    /// Decrypt an encrypted data key; `context` must match the one used to generate it
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<DecryptedKey, KmsError>;
}
