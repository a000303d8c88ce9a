use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::data::model::Row;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    pub reviews: usize,
}

/// Count rows per calendar month of `date_column`, oldest first.
/// Rows whose date is missing or unparsable are skipped.
pub fn monthly_counts<'a>(rows: impl IntoIterator<Item = &'a Row>, date_column: &str) -> Vec<MonthCount> {
    let mut counter: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let Some(raw) = row.get(date_column).and_then(|v| v.as_text()) else {
            continue;
        };
        if let Some(date) = parse_date(raw) {
            *counter.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
        }
    }
    counter
        .into_iter()
        .map(|(month, reviews)| MonthCount { month, reviews })
        .collect()
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (optionally with `T`) and
/// plain `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_str, LoadOptions};

    #[test]
    fn groups_by_month_in_order() {
        let table = parse_str(
            "id,timestamp\n\
             1,2024-03-02 10:00:00\n\
             2,2023-12-31\n\
             3,2024-03-15T08:30:00Z\n\
             4,not a date\n\
             5,\n\
             6,2024-01-09T23:59:59\n",
            &LoadOptions::default(),
        )
        .unwrap();
        let trend = monthly_counts(&table.rows, "timestamp");
        let months: Vec<_> = trend.iter().map(|m| (m.month.as_str(), m.reviews)).collect();
        assert_eq!(months, vec![("2023-12", 1), ("2024-01", 1), ("2024-03", 2)]);
    }

    #[test]
    fn empty_input_has_no_months() {
        assert!(monthly_counts(std::iter::empty(), "date").is_empty());
    }
}
