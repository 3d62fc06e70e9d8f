//! AES-GCM authenticated encryption for single-use data keys
//!
//! Every key passed to [`seal`] is a freshly generated KMS data key that is
//! never used again, so the nonce is the fixed all-zero [`ZERO_NONCE`] and is
//! not stored with the ciphertext. The output is `ciphertext || tag`.
//!
//! Sealing twice with the same key breaks AES-GCM confidentiality and
//! authenticity. Callers must never reuse a data key.

use crate::error::{Error, Result};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, Payload};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};

/// Nonce for every seal/open: all zeros, valid only because keys are single-use
pub const ZERO_NONCE: [u8; NONCE_SIZE] = [0u8; NONCE_SIZE];

/// GCM nonce size in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Nonce bytes carried inside the ciphertext (none with a fixed nonce)
pub const EMBEDDED_NONCE_SIZE: usize = 0;

/// GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Shortest ciphertext [`open`] will attempt to decrypt
pub const MIN_CIPHERTEXT_SIZE: usize = EMBEDDED_NONCE_SIZE + TAG_SIZE;

type Aes192Gcm = AesGcm<Aes192, U12>;

enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self> {
        let invalid = |_| Error::InvalidKeyLength { len: key.len() };
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key)
                .map(Self::Aes128)
                .map_err(invalid),
            24 => Aes192Gcm::new_from_slice(key)
                .map(Self::Aes192)
                .map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key)
                .map(Self::Aes256)
                .map_err(invalid),
            len => Err(Error::InvalidKeyLength { len }),
        }
    }

    fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes128(c) => encrypt_with(c, plaintext, aad),
            Self::Aes192(c) => encrypt_with(c, plaintext, aad),
            Self::Aes256(c) => encrypt_with(c, plaintext, aad),
        }
    }

    fn decrypt(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes128(c) => decrypt_with(c, ciphertext, aad),
            Self::Aes192(c) => decrypt_with(c, ciphertext, aad),
            Self::Aes256(c) => decrypt_with(c, ciphertext, aad),
        }
    }
}

fn encrypt_with<C>(cipher: &C, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    let nonce = Nonce::<U12>::from_slice(&ZERO_NONCE);
    cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| Error::malformed_ciphertext("plaintext too large for AES-GCM"))
}

fn decrypt_with<C>(cipher: &C, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    let nonce = Nonce::<U12>::from_slice(&ZERO_NONCE);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::Authentication)
}

/// Encrypt `plaintext` under a single-use `key`, authenticating `aad`
///
/// `key` must be 16, 24 or 32 bytes.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    Cipher::new(key)?.encrypt(plaintext, aad)
}

/// Decrypt the output of [`seal`], verifying the tag over ciphertext and `aad`
pub fn open(key: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Cipher::new(key)?;

    if ciphertext.len() < MIN_CIPHERTEXT_SIZE {
        return Err(Error::malformed_ciphertext(format!(
            "ciphertext is {} bytes, shorter than the {} byte minimum",
            ciphertext.len(),
            MIN_CIPHERTEXT_SIZE
        )));
    }

    cipher.decrypt(ciphertext, aad)
}
