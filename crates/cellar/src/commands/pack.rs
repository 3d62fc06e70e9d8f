//! Pack command
//!
//! Downloads every matching secret and seals them as one blob bound to the
//! given encryption context. The blob can be opened with `cellar unpack` by
//! anyone allowed to decrypt with the KMS key, without access to the bucket.

use crate::cli::{PackArgs, StoreArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;

pub async fn run(args: PackArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let manager = super::load_manager(config, store).await?;

    let blob = manager
        .pack(&args.pattern, &args.context, None)
        .await
        .with_context(|| format!("Failed to pack secrets matching {:?}", args.pattern))?;

    super::write_output(&args.file, &blob)?;

    output::success(&format!("Packed secrets matching {:?}", args.pattern));
    Ok(())
}
