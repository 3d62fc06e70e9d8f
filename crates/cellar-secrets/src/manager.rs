//! Secret store manager
//!
//! Orchestrates the envelope and bundle codec against object storage and key
//! management. Every operation is independent: the manager holds only its
//! configuration and collaborator handles, never plaintext between calls.
//!
//! Operations run strictly sequentially. Concurrent writers to the same path
//! race with last-writer-wins semantics; nothing here serializes them.

use crate::bundle;
use crate::config::{ManagerConfig, S3Location};
use crate::context::EncryptionContext;
use crate::envelope::Envelope;
use crate::error::{Error, Result, StorageError};
use crate::kms::{AwsKms, KeyManagement};
use crate::pattern::PathPattern;
use crate::storage::{ObjectStorage, S3Storage, CONTENT_TYPE};
use crate::types::{File, SecretMap};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Progress callback for [`Manager::rotate`], called with each path before it is rotated
pub type RotateCallback<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Manages envelope-encrypted secrets under one bucket and prefix
pub struct Manager {
    storage: Arc<dyn ObjectStorage>,
    envelope: Envelope,
    key_id: String,
    bucket: String,
    prefix: String,
    encryption_context: EncryptionContext,
}

impl Manager {
    /// Create a manager over explicit collaborators
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        kms: Arc<dyn KeyManagement>,
        key_id: impl Into<String>,
        location: S3Location,
    ) -> Self {
        Self {
            storage,
            envelope: Envelope::new(kms),
            key_id: key_id.into(),
            bucket: location.bucket,
            prefix: location.prefix,
            encryption_context: EncryptionContext::new(),
        }
    }

    /// Set the context merged into every secret's encryption context
    pub fn with_encryption_context(mut self, context: EncryptionContext) -> Self {
        self.encryption_context = context;
        self
    }

    /// Build a manager backed by AWS KMS and S3 from configuration
    pub async fn from_config(config: &ManagerConfig) -> Result<Self> {
        let region = config.region()?;
        let key_id = config.key_id()?;
        let location = config.location()?;

        let storage = S3Storage::new(region, config.endpoint.as_deref()).await;
        let kms = AwsKms::new(region).await;

        debug!(
            "Configured manager for {} with key {} in {}",
            location, key_id, region
        );

        Ok(
            Self::new(Arc::new(storage), Arc::new(kms), key_id, location)
                .with_encryption_context(config.encryption_context.clone()),
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Object key for a secret path
    fn object_key(&self, path: &str) -> Result<String> {
        let path = normalize_secret_path(path)?;
        if self.prefix.is_empty() {
            Ok(path)
        } else {
            Ok(format!("{}/{}", self.prefix, path))
        }
    }

    /// Prefix every stored secret's object key starts with
    fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }

    /// List stored secrets whose paths match `pattern`, sorted by path
    ///
    /// `pattern` is a comma-separated list of globs; empty matches everything.
    pub async fn list(&self, pattern: &str) -> Result<Vec<File>> {
        let pattern = PathPattern::new(pattern)?;
        let prefix = self.list_prefix();

        let objects = self
            .storage
            .list(&self.bucket, &prefix)
            .await
            .map_err(Error::Storage)?;

        let mut files: Vec<File> = objects
            .into_iter()
            .filter_map(|object| {
                let path = object.key.strip_prefix(&prefix)?.to_string();
                if path.is_empty() || !pattern.is_match(&path) {
                    return None;
                }
                Some(File {
                    path,
                    last_modified: object.last_modified,
                    size: object.size,
                    etag: object.etag.trim_matches('"').to_string(),
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Listed {} secrets under s3://{}/{}", files.len(), self.bucket, prefix);
        Ok(files)
    }

    /// Encrypt `plaintext` under a fresh data key and store it at `path`
    pub async fn upload(&self, path: &str, plaintext: &[u8]) -> Result<()> {
        let key = self.object_key(path)?;
        self.store(&key, plaintext).await?;

        info!("Uploaded secret {} to s3://{}/{}", path, self.bucket, key);
        Ok(())
    }

    /// Fetch and decrypt every path in `paths`
    ///
    /// The first failure aborts the call and is returned naming its path; no
    /// partial result is ever returned.
    pub async fn download<S: AsRef<str>>(&self, paths: &[S]) -> Result<SecretMap> {
        let mut secrets = SecretMap::new();

        for path in paths {
            let path = path.as_ref();
            let plaintext = self.fetch(path).await.map_err(|e| e.for_secret(path))?;
            secrets.insert(path.to_string(), plaintext.to_vec());
        }

        debug!("Downloaded {} secrets", secrets.len());
        Ok(secrets)
    }

    /// Delete the secret at `path`; deleting a missing secret succeeds
    pub async fn rm(&self, path: &str) -> Result<()> {
        let key = self.object_key(path)?;

        self.storage
            .delete(&self.bucket, &key)
            .await
            .map_err(Error::Storage)?;

        info!("Removed secret {} from s3://{}/{}", path, self.bucket, key);
        Ok(())
    }

    /// Download every secret matching `pattern` and seal them as one archive
    ///
    /// The blob is bound to `context` alone and sealed under `key_id`, or the
    /// manager's key when `None`.
    pub async fn pack(
        &self,
        pattern: &str,
        context: &EncryptionContext,
        key_id: Option<&str>,
    ) -> Result<Vec<u8>> {
        let paths: Vec<String> = self
            .list(pattern)
            .await?
            .into_iter()
            .map(|f| f.path)
            .collect();

        let secrets = self.download(&paths).await?;
        self.pack_secrets(&secrets, context, key_id).await
    }

    /// Seal an explicit mapping as one packed blob
    pub async fn pack_secrets(
        &self,
        secrets: &SecretMap,
        context: &EncryptionContext,
        key_id: Option<&str>,
    ) -> Result<Vec<u8>> {
        let archive = Zeroizing::new(bundle::pack(secrets)?);
        let key_id = key_id.unwrap_or(&self.key_id);

        let blob = self.envelope.seal(key_id, context, &archive).await?;
        info!("Packed {} secrets into {} bytes", secrets.len(), blob.len());
        Ok(blob)
    }

    /// Open a packed blob with `context` and return its secrets
    pub async fn unpack(&self, context: &EncryptionContext, blob: &[u8]) -> Result<SecretMap> {
        open_packed(&self.envelope, context, blob).await
    }

    /// Open a packed blob with key management alone
    ///
    /// The blob carries its own encrypted data key, so no bucket, prefix or
    /// default key id is involved.
    pub async fn unpack_with(
        kms: Arc<dyn KeyManagement>,
        context: &EncryptionContext,
        blob: &[u8],
    ) -> Result<SecretMap> {
        open_packed(&Envelope::new(kms), context, blob).await
    }

    /// Re-encrypt every secret matching `pattern` under a fresh data key
    ///
    /// Secrets are rotated one at a time. An error stops the run and names the
    /// path that failed; secrets already rotated stay rotated, so running again
    /// converges. Returns the rotated paths in order.
    pub async fn rotate(
        &self,
        pattern: &str,
        mut on_each: Option<RotateCallback<'_>>,
    ) -> Result<Vec<String>> {
        let files = self.list(pattern).await?;
        let mut rotated = Vec::with_capacity(files.len());

        for file in files {
            if let Some(callback) = on_each.as_mut() {
                callback(&file.path);
            }

            self.rotate_one(&file.path)
                .await
                .map_err(|e| e.for_secret(&file.path))?;

            debug!("Rotated secret {}", file.path);
            rotated.push(file.path);
        }

        info!("Rotated {} secrets", rotated.len());
        Ok(rotated)
    }

    async fn rotate_one(&self, path: &str) -> Result<()> {
        let plaintext = self.fetch(path).await?;
        let key = self.object_key(path)?;
        self.store(&key, &plaintext).await
    }

    /// Encryption context bound to the object at `key`
    fn secret_context(&self, key: &str) -> EncryptionContext {
        self.encryption_context.for_object(&self.bucket, key)
    }

    async fn fetch(&self, path: &str) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.object_key(path)?;

        let bundle = self
            .storage
            .get(&self.bucket, &key)
            .await
            .map_err(|e| match e {
                StorageError::NotFound { .. } => Error::NotFound {
                    path: path.to_string(),
                },
                other => Error::Storage(other),
            })?;

        let plaintext = self.envelope.open(&self.secret_context(&key), &bundle).await?;
        Ok(Zeroizing::new(plaintext))
    }

    async fn store(&self, key: &str, plaintext: &[u8]) -> Result<()> {
        let bundle = self
            .envelope
            .seal(&self.key_id, &self.secret_context(key), plaintext)
            .await?;

        self.storage
            .put(&self.bucket, key, bundle, CONTENT_TYPE)
            .await
            .map_err(Error::Storage)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("key_id", &self.key_id)
            .field("encryption_context", &self.encryption_context)
            .finish_non_exhaustive()
    }
}

async fn open_packed(
    envelope: &Envelope,
    context: &EncryptionContext,
    blob: &[u8],
) -> Result<SecretMap> {
    let archive = Zeroizing::new(envelope.open(context, blob).await?);
    let secrets = bundle::unpack(&archive)?;

    debug!("Unpacked {} secrets", secrets.len());
    Ok(secrets)
}

/// Normalize a secret path: surrounding `/`, empty and `.` segments are
/// dropped, and `..` may not climb above the prefix
fn normalize_secret_path(path: &str) -> Result<String> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::InvalidPath {
                        path: path.to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
        });
    }

    Ok(segments.join("/"))
}
