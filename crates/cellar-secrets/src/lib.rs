//! Envelope-encrypted secret storage for cellar
//!
//! This crate provides:
//! - **Envelope encryption**: single-use KMS data keys with AES-GCM, bound to
//!   an encryption context that names each secret's storage location
//! - **Bundles**: a fixed binary framing of encrypted data key plus ciphertext
//! - **Packing**: many secrets sealed as one tar archive under one data key
//! - **Management**: list, upload, download, remove, pack, unpack and rotate
//!   against S3 (or any [`storage::ObjectStorage`])

// Core modules
pub mod aead;
pub mod bundle;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod kms;
pub mod manager;
pub mod pattern;
pub mod storage;
pub mod types;

// Re-export commonly used items
pub use config::{ManagerConfig, S3Location};
pub use context::EncryptionContext;
pub use envelope::Envelope;
pub use error::{Error, KmsError, Result, StorageError};
pub use kms::{AwsKms, FakeKms, KeyManagement};
pub use manager::{Manager, RotateCallback};
pub use pattern::PathPattern;
pub use storage::{MemoryStorage, ObjectStorage, S3Storage};
pub use types::{File, SecretMap};
