//! Input document discovery and loading.
//!
//! This module finds export files with a glob pattern, derives each
//! entity's identifier from its file name, and parses the JSON body.

use crate::error::GridError;
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Configuration for input discovery.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Glob pattern for input files (e.g. `exports/*.json`)
    pub pattern: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            pattern: "*.json".to_string(),
        }
    }
}

impl From<&crate::config::ParseConfig> for SourceConfig {
    fn from(config: &crate::config::ParseConfig) -> Self {
        Self {
            pattern: config.input.clone(),
        }
    }
}

/// A discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// Entity identifier derived from the file name.
    pub identifier: String,
}

/// Matches the `_YYYY_MM_DD-HH_mm` suffix the capture step appends.
fn timestamp_tail() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"_\d{4}_\d{2}_\d{2}-\d{2}_\d{2}$").expect("timestamp pattern is valid")
    })
}

/// Derive an entity identifier from a file path: the file stem with any
/// trailing capture timestamp removed.
pub fn identifier_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    timestamp_tail().replace(&stem, "").into_owned()
}

/// Source of (identifier, document) pairs.
pub struct DocumentSource {
    config: SourceConfig,
}

impl DocumentSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn pattern(&self) -> &str {
        &self.config.pattern
    }

    /// List matching files, sorted by path.
    ///
    /// Matching nothing is an error: there is no batch to process.
    pub fn discover(&self) -> Result<Vec<InputFile>> {
        let entries = glob::glob(&self.config.pattern)
            .with_context(|| format!("Invalid input pattern: {}", self.config.pattern))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(path) => debug!("Ignoring non-file match {}", path.display()),
                Err(e) => warn!("Cannot read {}: {}", e.path().display(), e.error()),
            }
        }

        if paths.is_empty() {
            return Err(GridError::NoInputDocuments {
                pattern: self.config.pattern.clone(),
            }
            .into());
        }

        paths.sort();
        Ok(paths
            .into_iter()
            .map(|path| InputFile {
                identifier: identifier_from_path(&path),
                path,
            })
            .collect())
    }
}

/// Read and parse one document.
pub fn load_document(path: &Path) -> Result<Value, GridError> {
    let content = std::fs::read_to_string(path).map_err(|source| GridError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| GridError::DocumentParse {
        path: path.to_path_buf(),
        source,
    })
}
