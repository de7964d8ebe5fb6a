//! Table serialization to CSV and JSON.

use crate::models::{Table, TableMetadata};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write the table as CSV: header row, then one row per entity.
pub fn write_csv<W: Write>(table: &Table, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Generate CSV text for the table.
pub fn generate_csv(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    metadata: &'a TableMetadata,
    header: &'a [String],
    rows: &'a [Vec<String>],
}

/// Generate a JSON document with run metadata, header and rows.
pub fn generate_json(table: &Table, metadata: &TableMetadata) -> Result<String> {
    let doc = JsonDocument {
        metadata,
        header: &table.header,
        rows: &table.rows,
    };
    serde_json::to_string_pretty(&doc).map_err(Into::into)
}

/// Write already-rendered output to `path`.
pub fn save(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write table to {}", path.display()))
}
