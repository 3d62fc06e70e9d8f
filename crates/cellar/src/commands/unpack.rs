//! Unpack command
//!
//! Only KMS access is required: the blob carries its own encrypted data key.

use crate::cli::{StoreArgs, UnpackArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use cellar_secrets::{bundle, Manager};
use zeroize::Zeroizing;

pub async fn run(args: UnpackArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let kms = super::load_kms(config, store).await?;
    let blob = super::read_input(&args.file)?;

    let secrets = Manager::unpack_with(kms, &args.context, &blob)
        .await
        .with_context(|| format!("Failed to unpack {}", args.file))?;

    // Re-emit as a plain tar archive so it can be piped into `tar -x`
    let archive = Zeroizing::new(bundle::pack(&secrets)?);
    super::write_output(&args.output, &archive)?;

    output::info(&format!("Unpacked {} secrets", secrets.len()));
    Ok(())
}
