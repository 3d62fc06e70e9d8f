//! Version command

use crate::cli::VersionArgs;
use anyhow::Result;
use serde::Serialize;

const UNKNOWN: &str = "unknown";

/// What `cellar version` reports about this binary
#[derive(Debug, Serialize)]
struct BuildInfo {
    version: &'static str,
    rustc: &'static str,
    build_time: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            rustc: option_env!("CELLAR_RUSTC_VERSION").unwrap_or(UNKNOWN),
            build_time: option_env!("CELLAR_BUILD_TIME").unwrap_or(UNKNOWN),
        }
    }

    fn render(&self) -> String {
        format!(
            "version: {}\nrustc: {}\nbuild time: {}",
            self.version, self.rustc, self.build_time
        )
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    let info = BuildInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info.render());
    }

    Ok(())
}
