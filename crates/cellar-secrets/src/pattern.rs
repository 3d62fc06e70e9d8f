//! Secret path patterns: comma-separated shell globs

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Matches secret paths against a list like `*.txt,db/*`
///
/// `*` and `?` never cross a `/`. An empty pattern matches every path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    set: Option<GlobSet>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let globs: Vec<&str> = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if globs.is_empty() {
            return Ok(Self { set: None });
        }

        let invalid = |message: String| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        };

        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let glob = GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .map_err(|e| invalid(e.to_string()))?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| invalid(e.to_string()))?;
        Ok(Self { set: Some(set) })
    }

    /// Pattern matching every path
    pub fn all() -> Self {
        Self { set: None }
    }

    pub fn is_match(&self, path: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(path),
            None => true,
        }
    }
}
