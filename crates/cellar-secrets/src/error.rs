//! Error types for cellar-secrets

use thiserror::Error;

/// Result type alias using cellar-secrets' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the envelope, bundle codec and secret store manager
#[derive(Error, Debug)]
pub enum Error {
    /// Data key is not a valid AES key size
    #[error("Invalid key length: {len} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength { len: usize },

    /// Ciphertext or bundle framing is truncated or corrupt
    #[error("Malformed ciphertext: {message}")]
    MalformedCiphertext { message: String },

    /// AEAD tag did not verify: tampering, wrong context or wrong key
    #[error("Unable to decrypt secret: message authentication failed")]
    Authentication,

    /// KMS refused to issue a data key
    #[error("Unable to generate data key")]
    KeyGeneration(#[source] KmsError),

    /// KMS reported the encrypted data key itself as invalid
    #[error("Unable to decrypt data key: the encrypted data key is invalid for this context")]
    DataKeyDecryption(#[source] KmsError),

    /// Any other KMS decrypt failure (network, permissions, throttling)
    #[error("Key management service error")]
    KeyManagement(#[source] KmsError),

    /// Archive holds the same entry name twice
    #[error("Duplicate archive entry: {name}")]
    DuplicateEntry { name: String },

    /// Archive entry name escapes the archive root
    #[error("Archive entry escapes archive root: {name}")]
    PathTraversal { name: String },

    /// Archive could not be read or written
    #[error("Malformed archive: {message}")]
    MalformedArchive { message: String },

    /// Secret path is empty or climbs above the storage prefix
    #[error("Invalid secret path: {path:?}")]
    InvalidPath { path: String },

    /// Secret object does not exist
    #[error("Secret not found: {path}")]
    NotFound { path: String },

    /// Object storage failure other than a missing object
    #[error("Object storage error")]
    Storage(#[source] StorageError),

    /// Glob pattern could not be compiled
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Configuration is missing or malformed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Failure while processing one secret of a multi-secret operation
    #[error("Failed to process secret {path}")]
    Secret {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a malformed ciphertext error
    pub fn malformed_ciphertext(message: impl Into<String>) -> Self {
        Self::MalformedCiphertext {
            message: message.into(),
        }
    }

    /// Create a duplicate entry error
    pub fn duplicate_entry(name: impl Into<String>) -> Self {
        Self::DuplicateEntry { name: name.into() }
    }

    /// Create a path traversal error
    pub fn path_traversal(name: impl Into<String>) -> Self {
        Self::PathTraversal { name: name.into() }
    }

    /// Create a malformed archive error
    pub fn malformed_archive(message: impl Into<String>) -> Self {
        Self::MalformedArchive {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Attach the secret path that was being processed
    pub fn for_secret(self, path: impl Into<String>) -> Self {
        Self::Secret {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `Secret` wrappers
    pub fn root(&self) -> &Error {
        match self {
            Self::Secret { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors reported by a key management service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmsError {
    /// The ciphertext blob is not decryptable under the given context
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Transport, permission or service failure
    #[error("{0}")]
    Service(String),
}

/// Errors reported by an object store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No object at the given key
    #[error("no such key: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Transport, permission or service failure
    #[error("{0}")]
    Service(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;

    /// Display of every error in the source chain, outermost first
    fn chain(err: &Error) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            messages.push(cause.to_string());
            source = cause.source();
        }
        messages
    }

    #[test]
    fn test_for_secret_names_path_and_keeps_root() {
        let err = Error::Authentication.for_secret("db/password");

        assert_eq!(
            chain(&err),
            vec![
                "Failed to process secret db/password",
                "Unable to decrypt secret: message authentication failed",
            ]
        );
        assert!(matches!(err.root(), Error::Authentication));
    }

    #[test]
    fn test_data_key_decryption_is_distinct_from_service_error() {
        let invalid = Error::DataKeyDecryption(KmsError::InvalidCiphertext("bad blob".into()));
        let outage = Error::KeyManagement(KmsError::Service("timeout".into()));

        assert!(invalid.to_string().contains("Unable to decrypt data key"));
        assert_eq!(
            chain(&outage),
            vec!["Key management service error", "timeout"]
        );
    }

    #[test]
    fn test_causes_appear_once_in_chain() {
        let errors = [
            Error::KeyGeneration(KmsError::Service("throttled".into())),
            Error::KeyManagement(KmsError::Service("throttled".into())),
            Error::Storage(StorageError::Service("throttled".into())),
            Error::KeyGeneration(KmsError::Service("throttled".into())).for_secret("a.txt"),
        ];

        for err in &errors {
            let messages = chain(err);
            let mentions = messages.iter().filter(|m| m.contains("throttled")).count();
            assert_eq!(mentions, 1, "{:?}", messages);
        }
    }
}
