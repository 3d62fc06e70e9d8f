//! Encryption context: authenticated key/value pairs bound to a data key

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Context key injected by the manager to bind a secret to its location
pub const PATH_KEY: &str = "Path";

/// String-to-string map authenticated by KMS alongside a data key
///
/// Ordering is irrelevant to equality; a `BTreeMap` keeps iteration stable
/// so requests and logs are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionContext(BTreeMap<String, String>);

impl EncryptionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy of this context with the `Path` entry set to `s3://bucket/key`
    ///
    /// The injected entry overrides any caller-supplied `Path`.
    pub fn for_object(&self, bucket: &str, key: &str) -> Self {
        self.clone()
            .with(PATH_KEY, format!("s3://{}/{}", bucket, key))
    }

    /// Owned map in the shape the AWS SDK expects
    pub fn to_hash_map(&self) -> HashMap<String, String> {
        self.0.clone().into_iter().collect()
    }
}

impl FromIterator<(String, String)> for EncryptionContext {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for EncryptionContext {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Parses `key=value,key2=value2`. An empty string is an empty context.
impl FromStr for EncryptionContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut context = Self::new();
        if s.trim().is_empty() {
            return Ok(context);
        }

        for pair in s.split(',') {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::invalid_config(format!("unable to parse context: {:?}", pair))
            })?;
            context.insert(key, value);
        }
        Ok(context)
    }
}

impl fmt::Display for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", pairs.join(","))
    }
}
