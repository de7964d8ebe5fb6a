//! Year axis and month dictionary extraction.
//!
//! Neither extraction can fail: a malformed document simply yields an
//! empty year axis and the canonical month dictionary.

use super::path::{lookup, MONTH_LABELS, YEAR_ITEMS};
use crate::models::{MonthDictionary, YearAxis};
use serde_json::Value;

/// Collect `G1` from every item of the year list, in document order.
pub fn extract_years(doc: &Value) -> YearAxis {
    let items = lookup(doc, YEAR_ITEMS)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let labels = items
        .iter()
        .filter_map(|item| item.as_object()?.get("G1"))
        .filter_map(year_label)
        .collect();

    YearAxis::new(labels)
}

fn year_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => Some(n.to_string()),
        },
        _ => None,
    }
}

/// Read the month dictionary, falling back to `Jan..Dec` unless the
/// document supplies exactly twelve string labels.
pub fn extract_month_names(doc: &Value) -> MonthDictionary {
    let labels: Option<Vec<String>> = lookup(doc, MONTH_LABELS)
        .and_then(Value::as_array)
        .and_then(|arr| {
            arr.iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect()
        });

    labels.map(MonthDictionary::from_labels).unwrap_or_default()
}
