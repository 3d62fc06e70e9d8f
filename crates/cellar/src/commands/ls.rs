//! List command

use crate::cli::{LsArgs, StoreArgs};
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use cellar_secrets::File;
use tabled::{settings::Style, Table, Tabled};

/// Timestamp format for the modified column
const CONCISE_TIME: &str = "%Y-%m-%dT%H:%M";

#[derive(Tabled)]
struct FileRow {
    key: String,
    modified: String,
    size: u64,
    etag: String,
}

fn rows(files: &[File]) -> Vec<FileRow> {
    files
        .iter()
        .map(|f| FileRow {
            key: f.path.clone(),
            modified: f.last_modified.format(CONCISE_TIME).to_string(),
            size: f.size,
            etag: f.etag.clone(),
        })
        .collect()
}

pub async fn run(args: LsArgs, config: Option<&Utf8Path>, store: &StoreArgs) -> Result<()> {
    let manager = super::load_manager(config, store).await?;
    let pattern = args.pattern.unwrap_or_default();

    let files = manager
        .list(&pattern)
        .await
        .context("Failed to list secrets")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        output::warning("No secrets found");
        return Ok(());
    }

    let mut table = Table::new(rows(&files));
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}
