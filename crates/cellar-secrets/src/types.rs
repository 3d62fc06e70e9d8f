//! Shared types for secret storage

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Secret paths mapped to plaintext contents
pub type SecretMap = BTreeMap<String, Vec<u8>>;

/// A stored, encrypted secret as seen in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    /// Secret path relative to the manager's prefix
    pub path: String,
    /// Last modification time (UTC)
    pub last_modified: DateTime<Utc>,
    /// Size of the stored bundle in bytes
    pub size: u64,
    /// Content fingerprint reported by the object store, without quotes
    pub etag: String,
}
