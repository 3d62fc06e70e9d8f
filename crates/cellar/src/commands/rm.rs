//! Remove command

use crate::cli::{RmArgs, StoreArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;

pub async fn run(args: RmArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let manager = super::load_manager(config, store).await?;

    manager
        .rm(&args.path)
        .await
        .with_context(|| format!("Failed to remove {}", args.path))?;

    output::success(&format!("Removed {}", args.path));
    Ok(())
}
