//! Upload command

use crate::cli::{StoreArgs, UploadArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use zeroize::Zeroizing;

pub async fn run(args: UploadArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let manager = super::load_manager(config, store).await?;
    let plaintext = Zeroizing::new(super::read_input(&args.file)?);

    manager
        .upload(&args.path, &plaintext)
        .await
        .with_context(|| format!("Failed to upload {}", args.path))?;

    output::success(&format!("Uploaded {}", args.path));
    Ok(())
}
