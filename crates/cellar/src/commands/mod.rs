//! CLI command implementations

pub mod ls;
pub mod pack;
pub mod rm;
pub mod rotate;
pub mod unpack;
pub mod upload;
pub mod version;

use crate::cli::StoreArgs;
use anyhow::{Context, Result};
use camino::Utf8Path;
use cellar_secrets::{AwsKms, KeyManagement, Manager, ManagerConfig};
use std::io::{Read, Write};
use std::sync::Arc;

/// Path argument meaning stdin or stdout
const STDIO: &str = "-";

/// Resolve configuration: file, then environment, then flags
pub fn resolve_config(config_path: Option<&Utf8Path>, store: &StoreArgs) -> Result<ManagerConfig> {
    let mut config = match config_path {
        Some(path) => ManagerConfig::from_file(path.as_std_path())
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ManagerConfig::default(),
    }
    .merge_env();

    if let Some(region) = &store.region {
        config.region = Some(region.clone());
    }
    if let Some(key_id) = &store.key_id {
        config.key_id = Some(key_id.clone());
    }
    if let Some(s3_path) = &store.s3_path {
        config.s3_path = Some(s3_path.clone());
    }
    if let Some(endpoint) = &store.endpoint {
        config.endpoint = Some(endpoint.clone());
    }

    Ok(config)
}

/// Build a manager from resolved configuration
pub async fn load_manager(config_path: Option<&Utf8Path>, store: &StoreArgs) -> Result<Manager> {
    let config = resolve_config(config_path, store)?;
    Manager::from_config(&config)
        .await
        .context("Failed to configure secret store")
}

/// Build a key management client, which needs only the region
pub async fn load_kms(
    config_path: Option<&Utf8Path>,
    store: &StoreArgs,
) -> Result<Arc<dyn KeyManagement>> {
    let config = resolve_config(config_path, store)?;
    let region = config
        .region()
        .context("Failed to configure key management")?;
    Ok(Arc::new(AwsKms::new(region).await))
}

/// Read a file, or stdin for `-`
pub fn read_input(path: &Utf8Path) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    if path == STDIO {
        std::io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
    } else {
        data = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
    }
    Ok(data)
}

/// Write a file, or stdout for `-`
pub fn write_output(path: &Utf8Path, data: &[u8]) -> Result<()> {
    if path == STDIO {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(data).context("Failed to write stdout")?;
        stdout.flush().context("Failed to write stdout")?;
    } else {
        std::fs::write(path, data).with_context(|| format!("Failed to write {}", path))?;
    }
    Ok(())
}
