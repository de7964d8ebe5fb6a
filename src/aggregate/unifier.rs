//! Column schema unification across many decoded documents.

use crate::models::{column_key, CANONICAL_MONTHS};
use std::collections::BTreeSet;

/// Sort distinct year labels ascending.
///
/// Labels compare numerically when every one of them parses as an
/// integer, lexically otherwise.
pub fn sort_years(labels: &BTreeSet<String>) -> Vec<String> {
    let numeric: Option<Vec<(i64, &String)>> = labels
        .iter()
        .map(|label| label.parse::<i64>().ok().map(|n| (n, label)))
        .collect();

    match numeric {
        Some(mut pairs) => {
            // ties ("2019" vs "02019") fall back to the label itself
            pairs.sort();
            pairs.into_iter().map(|(_, label)| label.clone()).collect()
        }
        None => labels.iter().cloned().collect(),
    }
}

/// Identifier column followed by twelve calendar months per sorted year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeader {
    identifier: String,
    years: Vec<String>,
    columns: Vec<String>,
}

impl CanonicalHeader {
    /// Build the header from the union of every observed year label.
    pub fn build(identifier: &str, years: &BTreeSet<String>) -> Self {
        let years = sort_years(years);
        let columns = years
            .iter()
            .flat_map(|year| (0..CANONICAL_MONTHS.len()).filter_map(move |m| column_key(year, m)))
            .collect();

        Self {
            identifier: identifier.to_string(),
            years,
            columns,
        }
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    /// Every column after the identifier, in output order.
    pub fn value_columns(&self) -> &[String] {
        &self.columns
    }

    /// The full header row, identifier first.
    pub fn to_row(&self) -> Vec<String> {
        std::iter::once(self.identifier.clone())
            .chain(self.columns.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_sort() {
        let years = set(&["2023", "999", "2019", "10000"]);
        assert_eq!(sort_years(&years), vec!["999", "2019", "2023", "10000"]);
    }

    #[test]
    fn test_lexical_sort_when_any_label_is_not_an_integer() {
        let years = set(&["2023", "999", "FY2019"]);
        assert_eq!(sort_years(&years), vec!["2023", "999", "FY2019"]);
    }

    #[test]
    fn test_header_layout() {
        let header = CanonicalHeader::build("Route", &set(&["2020", "2019"]));
        let row = header.to_row();

        assert_eq!(row.len(), 1 + 24);
        assert_eq!(row[0], "Route");
        assert_eq!(row[1], "2019-Jan");
        assert_eq!(row[12], "2019-Dec");
        assert_eq!(row[13], "2020-Jan");
        assert_eq!(row[24], "2020-Dec");
        assert_eq!(header.years(), &["2019", "2020"]);

        let unique: BTreeSet<&String> = row.iter().collect();
        assert_eq!(unique.len(), row.len());
    }

    #[test]
    fn test_empty_union() {
        let header = CanonicalHeader::build("Route", &BTreeSet::new());
        assert_eq!(header.to_row(), vec!["Route"]);
        assert!(header.value_columns().is_empty());
    }
}
