//! Dense table rendering.

use crate::aggregate::{AggregatedBatch, CanonicalHeader};
use crate::models::{DecodedEntity, Table, ValueMode};

/// Render one entity against the header; absent cells are blank.
pub fn emit_row(header: &CanonicalHeader, entity: &DecodedEntity, mode: ValueMode) -> Vec<String> {
    std::iter::once(entity.identifier.clone())
        .chain(header.value_columns().iter().map(|column| {
            entity
                .table
                .get(column)
                .map(|value| mode.format(value))
                .unwrap_or_default()
        }))
        .collect()
}

/// Render every entity, in decode order, against the batch header.
pub fn emit_table(batch: &AggregatedBatch, mode: ValueMode) -> Table {
    Table {
        header: batch.header.to_row(),
        rows: batch
            .entities
            .iter()
            .map(|entity| emit_row(&batch.header, entity, mode))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use serde_json::{json, Value};

    fn export(years: &[&str], month_entries: Value) -> Value {
        let dm1: Vec<Value> = years.iter().map(|y| json!({ "G1": y })).collect();
        json!({"results": [{"result": {"data": {"dsr": {"DS": [{
            "SH": [{ "DM1": dm1 }],
            "PH": [{ "DM0": month_entries }]
        }]}}}}]})
    }

    #[test]
    fn test_rows_blank_outside_own_years() {
        let mut agg = Aggregator::new();
        agg.push("R1", &export(&["2019"], json!([{ "G0": 0, "X": [{ "M0": 0.5 }] }])));
        agg.push("R2", &export(&["2020"], json!([{ "G0": 11, "X": [{ "M0": 0.25 }] }])));
        let table = emit_table(&agg.finish("Route"), ValueMode::Proportion);

        assert_eq!(table.header.len(), 25);
        let r1 = &table.rows[0];
        let r2 = &table.rows[1];
        assert_eq!(r1[0], "R1");
        assert_eq!(r1[1], "0.5000");
        assert!(r1[13..].iter().all(|c| c.is_empty()));
        assert_eq!(r2[0], "R2");
        assert!(r2[1..13].iter().all(|c| c.is_empty()));
        assert_eq!(r2[24], "0.2500");
    }

    #[test]
    fn test_percent_mode() {
        let mut agg = Aggregator::new();
        agg.push("R1", &export(&["2019"], json!([{ "G0": 1, "X": [{ "M0": 0.69123 }] }])));
        let table = emit_table(&agg.finish("Route"), ValueMode::Percent);
        assert_eq!(table.rows[0][2], "69.12");
    }

    #[test]
    fn test_malformed_document_emits_blank_row() {
        let mut agg = Aggregator::new();
        agg.push("R1", &export(&["2019"], json!([{ "G0": 0, "X": [{ "M0": 0.5 }] }])));
        agg.push("Broken", &json!({"results": [{"result": {"data": {}}}]}));
        let table = emit_table(&agg.finish("Route"), ValueMode::Proportion);

        assert_eq!(table.rows[1][0], "Broken");
        assert_eq!(table.rows[1].len(), table.header.len());
        assert!(table.rows[1][1..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_round_trip_within_precision() {
        let values = [0.123456, 0.5, 0.99999, 0.0001];
        let xs: Vec<Value> = values.iter().map(|v| json!({ "M0": v })).collect();
        let doc = export(&["2019", "2020", "2021", "2022"], json!([{ "G0": 6, "X": xs }]));

        for (mode, scale, tolerance) in [
            (ValueMode::Proportion, 1.0, 0.5e-4),
            (ValueMode::Percent, 100.0, 0.5e-2),
        ] {
            let mut agg = Aggregator::new();
            agg.push("R1", &doc);
            let batch = agg.finish("Route");
            let row = emit_row(&batch.header, &batch.entities[0], mode);

            let emitted: Vec<f64> = row[1..]
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.parse::<f64>().unwrap() / scale)
                .collect();
            assert_eq!(emitted.len(), values.len());
            for (got, want) in emitted.iter().zip(values) {
                assert!((got - want).abs() <= tolerance / scale + 1e-12);
            }
        }
    }
}
