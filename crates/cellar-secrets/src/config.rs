//! Manager configuration: YAML file, then environment, then explicit overrides

use crate::context::EncryptionContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// AWS region holding the key and bucket
pub const ENV_REGION: &str = "CELLAR_REGION";

/// KMS key used to encrypt new data keys
pub const ENV_KEY_ID: &str = "CELLAR_KEY_ID";

/// Where secrets are stored, e.g. `s3://bucket/path`
pub const ENV_S3_PATH: &str = "CELLAR_S3_PATH";

/// Custom S3-compatible endpoint
pub const ENV_ENDPOINT: &str = "CELLAR_S3_ENDPOINT";

/// Configuration for building a [`crate::Manager`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// AWS region
    pub region: Option<String>,
    /// KMS key ID, ARN or alias
    pub key_id: Option<String>,
    /// Storage location, e.g. `s3://bucket/path`
    pub s3_path: Option<String>,
    /// Custom S3-compatible endpoint (optional)
    pub endpoint: Option<String>,
    /// Context merged into every secret's encryption context
    pub encryption_context: EncryptionContext,
}

impl ManagerConfig {
    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("unable to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Override fields with any non-empty `CELLAR_*` environment variables
    pub fn merge_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(region) = var(ENV_REGION) {
            self.region = Some(region);
        }
        if let Some(key_id) = var(ENV_KEY_ID) {
            self.key_id = Some(key_id);
        }
        if let Some(s3_path) = var(ENV_S3_PATH) {
            self.s3_path = Some(s3_path);
        }
        if let Some(endpoint) = var(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        self
    }

    pub fn region(&self) -> Result<&str> {
        self.region
            .as_deref()
            .ok_or_else(|| Error::invalid_config(format!("missing {}", ENV_REGION)))
    }

    pub fn key_id(&self) -> Result<&str> {
        self.key_id
            .as_deref()
            .ok_or_else(|| Error::invalid_config(format!("missing {}", ENV_KEY_ID)))
    }

    pub fn location(&self) -> Result<S3Location> {
        self.s3_path
            .as_deref()
            .ok_or_else(|| Error::invalid_config(format!("missing {}", ENV_S3_PATH)))?
            .parse()
    }
}

/// Bucket and key prefix parsed from an `s3://bucket/prefix` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    /// Key prefix without leading or trailing `/`; may be empty
    pub prefix: String,
}

impl FromStr for S3Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let url =
            Url::parse(s).map_err(|e| Error::invalid_config(format!("bad S3 path {:?}: {}", s, e)))?;

        if url.scheme() != "s3" {
            return Err(Error::invalid_config(format!(
                "bad S3 path {:?}: scheme must be s3",
                s
            )));
        }

        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::invalid_config(format!("bad S3 path {:?}: missing bucket", s)))?;

        let path = urlencoding::decode(url.path()).map_err(|e| {
            Error::invalid_config(format!("bad S3 path {:?}: {}", s, e))
        })?;

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: path.trim_matches('/').to_string(),
        })
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for name in [ENV_REGION, ENV_KEY_ID, ENV_S3_PATH, ENV_ENDPOINT] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_parse_location() {
        let location: S3Location = "s3://my-bucket/secrets/prod/".parse().unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.prefix, "secrets/prod");

        let location: S3Location = "s3://my-bucket".parse().unwrap();
        assert_eq!(location.prefix, "");
    }

    #[test]
    fn test_parse_location_decodes_prefix() {
        let location: S3Location = "s3://my-bucket/team secrets/prod".parse().unwrap();
        assert_eq!(location.prefix, "team secrets/prod");

        let location: S3Location = "s3://my-bucket/équipe/clés".parse().unwrap();
        assert_eq!(location.prefix, "équipe/clés");
        assert_eq!(location.to_string(), "s3://my-bucket/équipe/clés");
    }

    #[test]
    fn test_parse_location_rejects_other_schemes() {
        assert!("https://my-bucket/secrets".parse::<S3Location>().is_err());
        assert!("not a url".parse::<S3Location>().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let config = ManagerConfig::from_yaml(
            r#"
region: us-west-2
key_id: alias/cellar
s3_path: s3://bucket/secrets
encryption_context:
  app: web
"#,
        )
        .unwrap();

        assert_eq!(config.region().unwrap(), "us-west-2");
        assert_eq!(config.key_id().unwrap(), "alias/cellar");
        assert_eq!(config.location().unwrap().prefix, "secrets");
        assert_eq!(config.encryption_context.get("app"), Some("web"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_fields() {
        assert!(ManagerConfig::from_yaml("bucket: nope\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "region: eu-west-1").unwrap();

        let config = ManagerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));

        let missing = ManagerConfig::from_file(Path::new("/nonexistent/cellar.yaml"));
        assert!(matches!(missing, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_values() {
        clear_env();
        std::env::set_var(ENV_REGION, "ap-south-1");
        std::env::set_var(ENV_S3_PATH, "s3://env-bucket/env");
        std::env::set_var(ENV_KEY_ID, "");

        let config = ManagerConfig {
            region: Some("us-east-1".into()),
            key_id: Some("file-key".into()),
            ..Default::default()
        }
        .merge_env();

        assert_eq!(config.region().unwrap(), "ap-south-1");
        assert_eq!(config.key_id().unwrap(), "file-key");
        assert_eq!(config.location().unwrap().bucket, "env-bucket");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_values_name_the_variable() {
        clear_env();
        let config = ManagerConfig::default().merge_env();

        assert!(config.region().unwrap_err().to_string().contains(ENV_REGION));
        assert!(config.location().unwrap_err().to_string().contains(ENV_S3_PATH));
    }
}
