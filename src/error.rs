//! Error types surfaced at the document and output boundaries.
//!
//! Malformed document structure and unparseable cell values are never
//! errors: the decoder degrades to defaults and drops cells instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    /// The input pattern matched no files at all.
    #[error("no input documents matched '{pattern}'; use --input to point to your JSON exports")]
    NoInputDocuments { pattern: String },

    /// A document file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document file was read but is not valid JSON.
    #[error("failed to parse {}: {source}", .path.display())]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A capture target already exists; previously captured data is never overwritten.
    #[error("refusing to overwrite existing export {}", .path.display())]
    OutputTargetConflict { path: PathBuf },

    /// The request body template has no route literal to substitute.
    #[error("request body {} has no route literal at {location}", .path.display())]
    MissingTemplateLiteral { path: PathBuf, location: String },

    /// The export directory path points at a regular file.
    #[error("export directory \"{}\" is a file", .path.display())]
    ExportPathIsFile { path: PathBuf },
}
