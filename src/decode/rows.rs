//! Sparse month-by-year matrix decoding.
//!
//! Each month entry carries a list of observations, one per year, except
//! that leading years with no data are omitted. An observation may carry a
//! jump marker `I`: the absolute year-axis index for that position is at
//! least `I`, and the shift persists for the rest of that month's list.

use super::axis::{extract_month_names, extract_years};
use super::numeric::coerce_numeric;
use super::path::{lookup, MONTH_ENTRIES};
use crate::models::{DecodedDocument, EntityTable, MonthDictionary, ValueCell, YearAxis};
use serde_json::{Map, Value};
use tracing::{trace, warn};

/// One month's record: month index and its sparse observation list.
#[derive(Debug, Clone, Copy)]
pub struct MonthEntry<'a> {
    pub month_index: usize,
    pub observations: &'a [Value],
}

/// Ways of locating the metric inside an observation, tried in order.
#[derive(Debug, Clone, Copy)]
pub enum MetricField {
    /// A field with exactly this name.
    Exact(&'static str),
    /// The first field, in document order, whose name starts with this prefix.
    Prefix(&'static str),
}

pub const METRIC_FIELDS: &[MetricField] = &[MetricField::Exact("M0"), MetricField::Prefix("M")];

impl MetricField {
    fn resolve<'a>(&self, observation: &'a Map<String, Value>) -> Option<&'a Value> {
        match self {
            MetricField::Exact(name) => observation.get(*name),
            MetricField::Prefix(prefix) => observation
                .iter()
                .find(|(key, _)| key.starts_with(prefix))
                .map(|(_, value)| value),
        }
    }
}

/// Find the metric value of an observation, if it has one.
pub fn metric_value(observation: &Map<String, Value>) -> Option<&Value> {
    METRIC_FIELDS.iter().find_map(|field| field.resolve(observation))
}

/// Running year offset for one month's observation list.
///
/// The offset never shrinks: a later, smaller jump marker cannot un-skip
/// years that were already skipped.
#[derive(Debug, Default)]
pub struct YearCursor {
    offset: i64,
}

impl YearCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Year-axis index for the observation at `position`.
    pub fn advance(&mut self, position: usize, jump: Option<i64>) -> i64 {
        let position = position as i64;
        if let Some(jump) = jump {
            self.offset = self.offset.max(jump.saturating_sub(position));
        }
        position.saturating_add(self.offset)
    }
}

/// Any integer `I` is a jump marker. Values beyond `i64::MAX` clamp to it,
/// which pushes the observation past every year axis.
fn jump_marker(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|_| i64::MAX))
}

/// Month entries with a valid month index, sorted ascending by that index.
pub fn month_entries<'a>(doc: &'a Value, months: &MonthDictionary) -> Vec<MonthEntry<'a>> {
    let items = lookup(doc, MONTH_ENTRIES)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut entries: Vec<MonthEntry<'a>> = items
        .iter()
        .filter_map(|item| {
            let item = item.as_object()?;
            let month_index = item
                .get("G0")
                .and_then(Value::as_u64)
                .and_then(|i| usize::try_from(i).ok())
                .filter(|&i| i < months.len());
            let Some(month_index) = month_index else {
                trace!("Discarding month entry with G0 = {:?}", item.get("G0"));
                return None;
            };
            let observations = item
                .get("X")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            Some(MonthEntry {
                month_index,
                observations,
            })
        })
        .collect();

    entries.sort_by_key(|e| e.month_index);
    entries
}

/// Resolve every usable observation of one month entry into a cell.
pub fn decode_month(
    entry: &MonthEntry<'_>,
    years: &YearAxis,
    months: &MonthDictionary,
) -> Vec<ValueCell> {
    let Some(month) = months.label(entry.month_index) else {
        return Vec::new();
    };

    let mut cursor = YearCursor::new();
    let mut cells = Vec::new();

    for (position, observation) in entry.observations.iter().enumerate() {
        let Some(observation) = observation.as_object() else {
            continue;
        };

        let jump = observation.get("I").and_then(jump_marker);
        let year_index = cursor.advance(position, jump);
        let Some(year) = years.get(year_index) else {
            trace!(
                "Month {} position {} maps to year index {} outside {} years",
                month,
                position,
                year_index,
                years.len()
            );
            continue;
        };

        let Some(value) = metric_value(observation).and_then(coerce_numeric) else {
            trace!("Month {} position {} has no usable metric", month, position);
            continue;
        };

        cells.push(ValueCell {
            year: year.to_string(),
            month: month.to_string(),
            month_index: entry.month_index,
            value,
        });
    }

    cells
}

/// Decode one document into its year axis and entity table.
pub fn decode_document(doc: &Value) -> DecodedDocument {
    let years = extract_years(doc);
    let months = extract_month_names(doc);

    let mut table = EntityTable::new();
    let mut duplicate_keys = 0;

    for entry in month_entries(doc, &months) {
        for cell in decode_month(&entry, &years, &months) {
            let Some(key) = cell.column_key() else {
                trace!("No column for month index {}", cell.month_index);
                continue;
            };
            if let Some(previous) = table.insert(key.clone(), cell.value) {
                duplicate_keys += 1;
                warn!(
                    "Duplicate cell for {} {} (column {}): {} replaces {}",
                    cell.month, cell.year, key, cell.value, previous
                );
            }
        }
    }

    DecodedDocument {
        years,
        months,
        table,
        duplicate_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export(years: &[&str], month_entries: Value) -> Value {
        let dm1: Vec<Value> = years.iter().map(|y| json!({ "G1": y })).collect();
        json!({
            "results": [{
                "result": {
                    "data": {
                        "dsr": {
                            "DS": [{
                                "SH": [{ "DM1": dm1 }],
                                "PH": [{ "DM0": month_entries }],
                                "ValueDicts": {
                                    "D0": ["Jan","Feb","Mar","Apr","May","Jun","Jul","Aug","Sep","Oct","Nov","Dec"]
                                }
                            }]
                        }
                    }
                }
            }]
        })
    }

    #[test]
    fn test_dense_month() {
        let doc = export(
            &["2019", "2020"],
            json!([{ "G0": 0, "X": [{ "M0": 0.5 }, { "M0": 0.6 }] }]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 2);
        assert_eq!(decoded.table.get("2019-Jan"), Some(0.5));
        assert_eq!(decoded.table.get("2020-Jan"), Some(0.6));
        assert_eq!(decoded.years.labels(), &["2019", "2020"]);
    }

    #[test]
    fn test_jump_marker_skips_leading_year() {
        let doc = export(
            &["2019", "2020"],
            json!([{ "G0": 0, "X": [{ "I": 1, "M0": 0.9 }] }]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 1);
        assert_eq!(decoded.table.get("2020-Jan"), Some(0.9));
        assert_eq!(decoded.table.get("2019-Jan"), None);
    }

    #[test]
    fn test_jump_persists_and_never_shrinks() {
        let mut cursor = YearCursor::new();
        let indices: Vec<i64> = [None, Some(3), None, Some(1), None]
            .into_iter()
            .enumerate()
            .map(|(p, jump)| cursor.advance(p, jump))
            .collect();
        assert_eq!(indices, vec![0, 3, 4, 5, 6]);
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_offset_resets_per_month() {
        let doc = export(
            &["2019", "2020", "2021"],
            json!([
                { "G0": 1, "X": [{ "M0": 0.1 }, { "M0": 0.2 }, { "M0": 0.3 }] },
                { "G0": 0, "X": [{ "I": 2, "M0": 0.7 }] }
            ]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.get("2021-Jan"), Some(0.7));
        assert_eq!(decoded.table.get("2019-Feb"), Some(0.1));
        assert_eq!(decoded.table.get("2021-Feb"), Some(0.3));
        assert_eq!(decoded.table.len(), 4);
    }

    #[test]
    fn test_out_of_range_positions_dropped() {
        let doc = export(
            &["2019"],
            json!([{ "G0": 2, "X": [{ "M0": 0.1 }, { "M0": 0.2 }, { "I": 5, "M0": 0.3 }] }]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 1);
        assert_eq!(decoded.table.get("2019-Mar"), Some(0.1));
    }

    #[test]
    fn test_huge_jump_drops_rest_of_month() {
        let doc = export(
            &["2019", "2020"],
            json!([
                { "G0": 0, "X": [{ "I": i64::MAX, "M0": 0.1 }, { "M0": 0.2 }] },
                { "G0": 1, "X": [{ "M0": 0.3 }] }
            ]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 1);
        assert_eq!(decoded.table.get("2019-Feb"), Some(0.3));

        let mut cursor = YearCursor::new();
        assert_eq!(cursor.advance(0, Some(i64::MAX)), i64::MAX);
        assert_eq!(cursor.advance(1, None), i64::MAX);
    }

    #[test]
    fn test_unsigned_jump_beyond_i64_is_still_a_jump() {
        let doc = export(
            &["2019", "2020"],
            json!([{ "G0": 0, "X": [{ "I": u64::MAX, "M0": 0.1 }] }]),
        );
        let decoded = decode_document(&doc);
        assert!(decoded.table.is_empty());

        assert_eq!(jump_marker(&json!(u64::MAX)), Some(i64::MAX));
        assert_eq!(jump_marker(&json!(2)), Some(2));
        assert_eq!(jump_marker(&json!(1.5)), None);
        assert_eq!(jump_marker(&json!("2")), None);
    }

    #[test]
    fn test_invalid_month_entries_discarded() {
        let doc = export(
            &["2019"],
            json!([
                { "G0": 12, "X": [{ "M0": 0.1 }] },
                { "G0": -1, "X": [{ "M0": 0.1 }] },
                { "G0": "3", "X": [{ "M0": 0.1 }] },
                { "X": [{ "M0": 0.1 }] },
                { "G0": 4 },
                "junk",
                { "G0": 5, "X": [{ "M0": 0.4 }] }
            ]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 1);
        assert_eq!(decoded.table.get("2019-Jun"), Some(0.4));
    }

    #[test]
    fn test_metric_field_resolution_order() {
        let preferred = json!({ "M1": 2.0, "M0": 1.0 });
        assert_eq!(metric_value(preferred.as_object().unwrap()), Some(&json!(1.0)));

        let fallback = json!({ "I": 1, "Mx": 3.0, "M2": 4.0 });
        assert_eq!(metric_value(fallback.as_object().unwrap()), Some(&json!(3.0)));

        let none = json!({ "I": 1, "C": [1] });
        assert_eq!(metric_value(none.as_object().unwrap()), None);
    }

    #[test]
    fn test_unparseable_and_missing_values_dropped() {
        let doc = export(
            &["2019", "2020", "2021", "2022"],
            json!([{ "G0": 0, "X": [{ "M0": "oops" }, { "I": 1 }, "junk", { "M3": "1,234.5e-3" }] }]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.len(), 1);
        assert_eq!(decoded.table.get("2022-Jan"), Some(1.2345));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let doc = export(
            &["2019"],
            json!([
                { "G0": 0, "X": [{ "M0": 0.1 }] },
                { "G0": 0, "X": [{ "M0": 0.2 }] }
            ]),
        );
        let decoded = decode_document(&doc);
        assert_eq!(decoded.table.get("2019-Jan"), Some(0.2));
        assert_eq!(decoded.duplicate_keys, 1);
    }

    #[test]
    fn test_missing_dsr_yields_empty_table() {
        let doc = json!({ "results": [{ "result": { "data": {} } }] });
        let decoded = decode_document(&doc);
        assert!(decoded.years.is_empty());
        assert!(decoded.table.is_empty());
        assert_eq!(decoded.months, MonthDictionary::default());
    }

    #[test]
    fn test_custom_month_labels_keyed_canonically() {
        let mut doc = export(&["2019"], json!([{ "G0": 1, "X": [{ "M0": 0.5 }] }]));
        let names: Vec<String> = (1..=12).map(|m| format!("Month {}", m)).collect();
        doc["results"][0]["result"]["data"]["dsr"]["DS"][0]["ValueDicts"]["D0"] = json!(names);

        let months = extract_month_names(&doc);
        let years = extract_years(&doc);
        let entries = month_entries(&doc, &months);
        let cells = decode_month(&entries[0], &years, &months);
        assert_eq!(cells[0].month, "Month 2");
        assert_eq!(cells[0].column_key().as_deref(), Some("2019-Feb"));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let doc = export(
            &["2018", "2019", "2020"],
            json!([
                { "G0": 3, "X": [{ "I": 1, "M0": 0.3 }, { "M0": 0.4 }] },
                { "G0": 0, "X": [{ "M0": 0.1 }, { "M0": "0.2" }] }
            ]),
        );
        assert_eq!(decode_document(&doc), decode_document(&doc));
    }
}
