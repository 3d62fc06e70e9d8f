//! In-memory object storage for tests

use super::{ObjectStorage, ObjectSummary};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

/// A recorded storage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRequest {
    List { bucket: String, prefix: String },
    Get { bucket: String, key: String },
    Put {
        bucket: String,
        key: String,
        content_type: String,
        body: Vec<u8>,
    },
    Delete { bucket: String, key: String },
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), StoredObject>,
    requests: Vec<StorageRequest>,
    // Remaining successful puts before every further put fails
    puts_until_failure: Option<usize>,
}

/// Map-backed [`ObjectStorage`] that records every call
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an object directly, bypassing request recording
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.state().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                last_modified: Utc::now(),
            },
        );
    }

    /// Read an object directly, bypassing request recording
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    /// Keys currently stored in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Let the next `successful` puts through, then fail every put after that
    pub fn fail_puts_after(&self, successful: usize) {
        self.state().puts_until_failure = Some(successful);
    }

    /// Stop injecting put failures
    pub fn clear_failures(&self) {
        self.state().puts_until_failure = None;
    }

    /// All calls so far, oldest first
    pub fn requests(&self) -> Vec<StorageRequest> {
        self.state().requests.clone()
    }

    /// Only the recorded puts
    pub fn put_requests(&self) -> Vec<StorageRequest> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, StorageRequest::Put { .. }))
            .collect()
    }
}

fn etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut state = self.state();
        state.requests.push(StorageRequest::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });

        Ok(state
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), object)| ObjectSummary {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.body.len() as u64,
                etag: etag(&object.body),
            })
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut state = self.state();
        state.requests.push(StorageRequest::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.state();
        state.requests.push(StorageRequest::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body: body.clone(),
        });

        match state.puts_until_failure {
            Some(0) => {
                return Err(StorageError::Service(format!(
                    "injected failure writing {}/{}",
                    bucket, key
                )))
            }
            Some(n) => state.puts_until_failure = Some(n - 1),
            None => {}
        }

        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        state.requests.push(StorageRequest::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
