//! Multi-document aggregation.
//!
//! Decoding and emission are separate stages. An [`Aggregator`] buffers
//! every decoded entity and the union of their year labels; only once it
//! is drained with [`Aggregator::finish`] does the canonical header exist,
//! and only an [`AggregatedBatch`] can be rendered into a table.

pub mod unifier;

pub use unifier::CanonicalHeader;

use crate::decode::decode_document;
use crate::error::GridError;
use crate::models::{BatchSummary, DecodedEntity, SkippedDocument};
use crate::source::{load_document, InputFile};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Buffering stage that collects decoded entities.
#[derive(Debug, Default)]
pub struct Aggregator {
    years: BTreeSet<String>,
    entities: Vec<DecodedEntity>,
    skipped: Vec<SkippedDocument>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one document and buffer the result.
    pub fn push(&mut self, identifier: impl Into<String>, document: &Value) {
        let identifier = identifier.into();
        let decoded = decode_document(document);

        debug!(
            "Decoded {}: {} years, {} cells",
            identifier,
            decoded.years.len(),
            decoded.table.len()
        );
        if decoded.years.is_empty() {
            warn!("{} has no year axis; its row will be blank", identifier);
        } else if decoded.table.is_empty() {
            debug!("{} produced no cells; its row will be blank", identifier);
        }
        if !decoded.months.is_canonical() {
            debug!(
                "{} uses non-canonical month labels; columns stay keyed by calendar month",
                identifier
            );
        }

        self.years.extend(decoded.years.labels().iter().cloned());
        self.entities.push(DecodedEntity {
            identifier,
            table: decoded.table,
            duplicate_keys: decoded.duplicate_keys,
        });
    }

    /// Record a document that could not be read.
    pub fn skip(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        let skipped = SkippedDocument {
            path: path.into(),
            reason: reason.into(),
        };
        warn!("Skipping {}: {}", skipped.path.display(), skipped.reason);
        self.skipped.push(skipped);
    }

    /// Close the stage and compute the canonical header.
    pub fn finish(self, identifier_column: &str) -> AggregatedBatch {
        let header = CanonicalHeader::build(identifier_column, &self.years);
        AggregatedBatch {
            header,
            entities: self.entities,
            skipped: self.skipped,
        }
    }
}

/// Every decoded entity plus the header they will be rendered against.
#[derive(Debug, Clone)]
pub struct AggregatedBatch {
    pub header: CanonicalHeader,
    pub entities: Vec<DecodedEntity>,
    pub skipped: Vec<SkippedDocument>,
}

impl AggregatedBatch {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            entities: self.entities.len(),
            cells: self.entities.iter().map(|e| e.table.len()).sum(),
            years: self.header.years().len(),
            duplicate_keys: self.entities.iter().map(|e| e.duplicate_keys).sum(),
            skipped: self.skipped.len(),
        }
    }
}

/// Load and decode every input file, skipping the ones that cannot be read.
pub fn collect(files: &[InputFile], identifier_column: &str) -> AggregatedBatch {
    let mut agg = Aggregator::new();
    for file in files {
        match load_document(&file.path) {
            Ok(document) => agg.push(file.identifier.as_str(), &document),
            Err(GridError::DocumentRead { source, .. }) => agg.skip(&file.path, source.to_string()),
            Err(GridError::DocumentParse { source, .. }) => {
                agg.skip(&file.path, format!("invalid JSON: {}", source))
            }
            Err(e) => agg.skip(&file.path, e.to_string()),
        }
    }
    agg.finish(identifier_column)
}
