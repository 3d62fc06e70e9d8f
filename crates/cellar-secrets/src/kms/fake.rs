//! In-memory key management for tests
//!
//! Records every request and plays back queued responses. With nothing
//! queued it behaves like a tiny KMS: it mints random data keys, remembers
//! which context each was issued under, and refuses to decrypt a blob it never
//! issued or under a different context.

use super::{DataKey, DecryptedKey, KeyManagement};
use crate::context::EncryptionContext;
use crate::error::KmsError;
use async_trait::async_trait;
use rand::RngCore;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use zeroize::Zeroizing;

/// A recorded `generate_data_key` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub key_id: String,
    pub context: EncryptionContext,
    pub num_bytes: usize,
}

/// A recorded `decrypt` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptRequest {
    pub ciphertext: Vec<u8>,
    pub context: EncryptionContext,
}

struct IssuedKey {
    plaintext: Zeroizing<Vec<u8>>,
    key_id: String,
    context: EncryptionContext,
}

#[derive(Default)]
struct State {
    generate_requests: Vec<GenerateRequest>,
    decrypt_requests: Vec<DecryptRequest>,
    generate_responses: VecDeque<Result<DataKey, KmsError>>,
    decrypt_responses: VecDeque<Result<DecryptedKey, KmsError>>,
    issued: HashMap<Vec<u8>, IssuedKey>,
    minted: u64,
}

/// Recording, scriptable [`KeyManagement`] implementation
#[derive(Default)]
pub struct FakeKms {
    state: Mutex<State>,
}

impl FakeKms {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the response for the next `generate_data_key` call
    pub fn push_generate_response(&self, response: Result<DataKey, KmsError>) {
        self.state().generate_responses.push_back(response);
    }

    /// Queue the response for the next `decrypt` call
    pub fn push_decrypt_response(&self, response: Result<DecryptedKey, KmsError>) {
        self.state().decrypt_responses.push_back(response);
    }

    /// All `generate_data_key` calls so far, oldest first
    pub fn generate_requests(&self) -> Vec<GenerateRequest> {
        self.state().generate_requests.clone()
    }

    /// All `decrypt` calls so far, oldest first
    pub fn decrypt_requests(&self) -> Vec<DecryptRequest> {
        self.state().decrypt_requests.clone()
    }
}

#[async_trait]
impl KeyManagement for FakeKms {
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        num_bytes: usize,
    ) -> Result<DataKey, KmsError> {
        let mut state = self.state();
        state.generate_requests.push(GenerateRequest {
            key_id: key_id.to_string(),
            context: context.clone(),
            num_bytes,
        });

        let key = match state.generate_responses.pop_front() {
            Some(response) => response?,
            None => {
                state.minted += 1;
                let mut plaintext = vec![0u8; num_bytes];
                rand::rng().fill_bytes(&mut plaintext);
                DataKey {
                    plaintext,
                    ciphertext: format!("{}/data-key-{}", key_id, state.minted).into_bytes(),
                    key_id: key_id.to_string(),
                }
            }
        };

        state.issued.insert(
            key.ciphertext.clone(),
            IssuedKey {
                plaintext: Zeroizing::new(key.plaintext.clone()),
                key_id: key.key_id.clone(),
                context: context.clone(),
            },
        );

        Ok(key)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<DecryptedKey, KmsError> {
        let mut state = self.state();
        state.decrypt_requests.push(DecryptRequest {
            ciphertext: ciphertext.to_vec(),
            context: context.clone(),
        });

        if let Some(response) = state.decrypt_responses.pop_front() {
            return response;
        }

        match state.issued.get(ciphertext) {
            Some(issued) if issued.context == *context => Ok(DecryptedKey {
                plaintext: issued.plaintext.to_vec(),
                key_id: issued.key_id.clone(),
            }),
            _ => Err(KmsError::InvalidCiphertext(
                "ciphertext was not issued under this encryption context".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_minted_keys_decrypt_under_same_context() {
        let kms = FakeKms::new();
        let context = EncryptionContext::new().with("A", "B");

        let key = kms.generate_data_key("key1", &context, 32).await.unwrap();
        let decrypted = kms.decrypt(&key.ciphertext, &context).await.unwrap();

        assert_eq!(key.plaintext.len(), 32);
        assert_eq!(decrypted.plaintext, key.plaintext);
        assert_eq!(decrypted.key_id, "key1");
    }

    #[tokio::test]
    async fn test_context_mismatch_is_invalid_ciphertext() {
        let kms = FakeKms::new();
        let key = kms
            .generate_data_key("key1", &EncryptionContext::new().with("A", "B"), 32)
            .await
            .unwrap();

        let result = kms
            .decrypt(&key.ciphertext, &EncryptionContext::new().with("A", "C"))
            .await;

        assert!(matches!(result, Err(KmsError::InvalidCiphertext(_))));
    }

    #[tokio::test]
    async fn test_minted_keys_are_distinct() {
        let kms = FakeKms::new();
        let context = EncryptionContext::new();

        let a = kms.generate_data_key("key1", &context, 32).await.unwrap();
        let b = kms.generate_data_key("key1", &context, 32).await.unwrap();

        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.plaintext, b.plaintext);
    }

    #[tokio::test]
    async fn test_canned_responses_and_recording() {
        let kms = FakeKms::new();
        kms.push_generate_response(Err(KmsError::Service("throttled".into())));
        kms.push_decrypt_response(Ok(DecryptedKey {
            plaintext: vec![0u8; 32],
            key_id: "key9".into(),
        }));

        let context = EncryptionContext::new().with("A", "B");
        let generated = kms.generate_data_key("key1", &context, 32).await;
        let decrypted = kms.decrypt(b"anything", &context).await.unwrap();

        assert_eq!(generated.unwrap_err(), KmsError::Service("throttled".into()));
        assert_eq!(decrypted.key_id, "key9");
        assert_eq!(
            kms.generate_requests(),
            vec![GenerateRequest {
                key_id: "key1".into(),
                context: context.clone(),
                num_bytes: 32,
            }]
        );
        assert_eq!(kms.decrypt_requests()[0].ciphertext, b"anything");
    }
}
