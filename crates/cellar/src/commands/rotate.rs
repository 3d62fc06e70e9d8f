//! Rotate command

use crate::cli::{RotateArgs, StoreArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::info;

pub async fn run(args: RotateArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let manager = super::load_manager(config, store).await?;
    let pattern = args.pattern.unwrap_or_default();

    let mut progress = |path: &str| info!("Rotating {}", path);
    let rotated = manager
        .rotate(&pattern, Some(&mut progress))
        .await
        .context("Rotation stopped; already rotated secrets keep their new keys, re-run to finish")?;

    if rotated.is_empty() {
        output::warning("No secrets matched");
    } else {
        output::success(&format!("Rotated {} secrets", rotated.len()));
    }
    Ok(())
}
