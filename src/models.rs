//! Data models for the route grid.
//!
//! This module contains the core data structures shared by the decoder,
//! the aggregator and the table writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Calendar month abbreviations, index 0 = January.
pub const CANONICAL_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Ordered year labels as found in one document.
///
/// Position is meaningful: the sparse encoding addresses years by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearAxis(Vec<String>);

impl YearAxis {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    /// Resolve a year-axis index; negative or out-of-range indices yield `None`.
    pub fn get(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Exactly twelve month labels, index 0-11.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthDictionary(Vec<String>);

impl Default for MonthDictionary {
    fn default() -> Self {
        Self(CANONICAL_MONTHS.iter().map(|m| m.to_string()).collect())
    }
}

impl MonthDictionary {
    /// Accept the labels only when there are exactly twelve of them.
    pub fn from_labels(labels: Vec<String>) -> Self {
        if labels.len() == CANONICAL_MONTHS.len() {
            Self(labels)
        } else {
            Self::default()
        }
    }

    pub fn label(&self, month_index: usize) -> Option<&str> {
        self.0.get(month_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the labels are exactly `Jan..Dec`.
    pub fn is_canonical(&self) -> bool {
        self.0.iter().zip(CANONICAL_MONTHS).all(|(a, b)| a == b)
    }
}

/// Column key for a year label and a month index, e.g. `2019-Jan`.
///
/// Only indices 0-11 name a month; anything else has no key.
pub fn column_key(year: &str, month_index: usize) -> Option<String> {
    let month = CANONICAL_MONTHS.get(month_index)?;
    Some(format!("{}-{}", year, month))
}

/// One resolved observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCell {
    pub year: String,
    /// Month label as the document names it.
    pub month: String,
    pub month_index: usize,
    pub value: f64,
}

impl ValueCell {
    pub fn column_key(&self) -> Option<String> {
        column_key(&self.year, self.month_index)
    }
}

/// Column key -> value for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTable {
    values: HashMap<String, f64>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, returning the one it replaced, if any.
    pub fn insert(&mut self, key: String, value: f64) -> Option<f64> {
        self.values.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything recovered from a single document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedDocument {
    pub years: YearAxis,
    pub months: MonthDictionary,
    pub table: EntityTable,
    /// Cells that overwrote an earlier cell with the same key.
    pub duplicate_keys: usize,
}

/// A decoded document paired with its entity identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub identifier: String,
    pub table: EntityTable,
    pub duplicate_keys: usize,
}

/// A document left out of the batch, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// How numeric cells are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Raw value, 4 decimal places (default)
    #[default]
    Proportion,
    /// Value x 100, 2 decimal places
    Percent,
}

impl ValueMode {
    pub fn format(&self, value: f64) -> String {
        match self {
            ValueMode::Proportion => format!("{:.4}", value),
            ValueMode::Percent => format!("{:.2}", value * 100.0),
        }
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMode::Proportion => write!(f, "proportion"),
            ValueMode::Percent => write!(f, "percent"),
        }
    }
}

/// The dense output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Counts describing one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub entities: usize,
    pub cells: usize,
    pub years: usize,
    pub duplicate_keys: usize,
    pub skipped: usize,
}

/// Metadata attached to JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub generated_at: DateTime<Utc>,
    pub input: String,
    pub mode: ValueMode,
    pub summary: BatchSummary,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped: Vec<SkippedDocument>,
}
