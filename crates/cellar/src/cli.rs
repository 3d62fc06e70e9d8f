//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use cellar_secrets::config::{ENV_ENDPOINT, ENV_KEY_ID, ENV_REGION, ENV_S3_PATH};
use cellar_secrets::EncryptionContext;
use clap::{Args, Parser, Subcommand};

/// Cellar - envelope-encrypted secrets in S3
#[derive(Parser, Debug)]
#[command(name = "cellar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a cellar.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where secrets live and which key protects them
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// AWS region where the key and bucket are located
    #[arg(long, global = true, env = ENV_REGION)]
    pub region: Option<String>,

    /// KMS key used when encrypting secrets
    #[arg(long, global = true, env = ENV_KEY_ID)]
    pub key_id: Option<String>,

    /// Where secrets are stored (e.g. s3://bucket/path)
    #[arg(long, global = true, env = ENV_S3_PATH)]
    pub s3_path: Option<String>,

    /// Custom S3-compatible endpoint (e.g., MinIO)
    #[arg(long, global = true, env = ENV_ENDPOINT)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored secrets
    Ls(LsArgs),

    /// Encrypt a file and store it as a secret
    Upload(UploadArgs),

    /// Delete a secret
    Rm(RmArgs),

    /// Seal matching secrets into one portable blob
    Pack(PackArgs),

    /// Open a packed blob and write its secrets as a tar archive
    Unpack(UnpackArgs),

    /// Re-encrypt secrets under fresh data keys
    Rotate(RotateArgs),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Comma-separated globs, e.g. "*.txt,*.key" (default: all)
    pub pattern: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload, or - for stdin
    pub file: Utf8PathBuf,

    /// Secret path, relative to the S3 path
    pub path: String,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Secret path, relative to the S3 path
    pub path: String,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Comma-separated globs selecting the secrets to pack
    pub pattern: String,

    /// Output file, or - for stdout
    pub file: Utf8PathBuf,

    /// Encryption context, e.g. "env=prod,app=web"
    #[arg(long, default_value = "")]
    pub context: EncryptionContext,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Packed blob, or - for stdin
    pub file: Utf8PathBuf,

    /// Output tar archive, or - for stdout
    pub output: Utf8PathBuf,

    /// Encryption context the blob was packed with
    #[arg(long, default_value = "")]
    pub context: EncryptionContext,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Comma-separated globs selecting the secrets to rotate (default: all)
    pub pattern: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
