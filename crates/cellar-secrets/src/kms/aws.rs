//! AWS KMS binding for [`KeyManagement`]

use super::{DataKey, DecryptedKey, KeyManagement};
use crate::context::EncryptionContext;
use crate::error::KmsError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::config::Region;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client;
use tracing::debug;

/// Key management backed by AWS KMS
#[derive(Clone)]
pub struct AwsKms {
    client: Client,
}

impl AwsKms {
    /// Create a KMS client for `region` using the default credential chain
    pub async fn new(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self::from_client(Client::new(&sdk_config))
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyManagement for AwsKms {
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        num_bytes: usize,
    ) -> Result<DataKey, KmsError> {
        debug!("Generating {}-byte data key under {}", num_bytes, key_id);

        let num_bytes = i32::try_from(num_bytes)
            .map_err(|_| KmsError::Service(format!("data key size {} too large", num_bytes)))?;

        let resp = self
            .client
            .generate_data_key()
            .key_id(key_id)
            .number_of_bytes(num_bytes)
            .set_encryption_context(Some(context.to_hash_map()))
            .send()
            .await
            .map_err(|e| KmsError::Service(e.into_service_error().to_string()))?;

        let plaintext = resp
            .plaintext
            .ok_or_else(|| KmsError::Service("response missing plaintext key".to_string()))?
            .into_inner();
        let ciphertext = resp
            .ciphertext_blob
            .ok_or_else(|| KmsError::Service("response missing ciphertext blob".to_string()))?
            .into_inner();
        let key_id = resp
            .key_id
            .ok_or_else(|| KmsError::Service("response missing key ID".to_string()))?;

        Ok(DataKey {
            plaintext,
            ciphertext,
            key_id,
        })
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<DecryptedKey, KmsError> {
        debug!("Decrypting {}-byte data key", ciphertext.len());

        let resp = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .set_encryption_context(Some(context.to_hash_map()))
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_invalid_ciphertext_exception() {
                    KmsError::InvalidCiphertext(service_error.to_string())
                } else {
                    KmsError::Service(service_error.to_string())
                }
            })?;

        let plaintext = resp
            .plaintext
            .ok_or_else(|| KmsError::Service("response missing plaintext key".to_string()))?
            .into_inner();
        let key_id = resp
            .key_id
            .ok_or_else(|| KmsError::Service("response missing key ID".to_string()))?;

        Ok(DecryptedKey { plaintext, key_id })
    }
}

impl std::fmt::Debug for AwsKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKms").finish_non_exhaustive()
    }
}
