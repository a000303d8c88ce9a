use serde::{Deserialize, Serialize};

use super::model::{Table, Value};
use crate::stats::tally::{LabelMode, SentimentLabel};

// ---------------------------------------------------------------------------
// Filter predicate: search text, flag presence, sentiment label
// ---------------------------------------------------------------------------

/// Whether rows must carry a moderation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlagFilter {
    #[default]
    All,
    Has,
    None,
}

/// Per-panel row selection.
///
/// An empty query and [`FlagFilter::All`] with no label means "no filter".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowFilter {
    /// Case-insensitive substring, matched against `search_columns`.
    pub query: String,
    pub search_columns: Vec<String>,
    pub flag: FlagFilter,
    pub flag_column: String,
    pub label: Option<SentimentLabel>,
    pub label_column: String,
    pub label_mode: LabelMode,
}

impl RowFilter {
    /// Defaults matching the review tables: search game/text/flag, flag
    /// column `flag`, labels in `sentiment`.
    pub fn for_reviews() -> Self {
        Self {
            search_columns: vec!["game".into(), "text".into(), "flag".into()],
            flag_column: "flag".into(),
            label_column: "sentiment".into(),
            ..Self::default()
        }
    }

    fn matches(&self, table: &Table, index: usize, needle: &str) -> bool {
        let has_flag = matches!(table.value(index, &self.flag_column), Value::Text(s) if !s.trim().is_empty());
        match self.flag {
            FlagFilter::Has if !has_flag => return false,
            FlagFilter::None if has_flag => return false,
            _ => {}
        }

        if let Some(label) = self.label {
            let cell = table.value(index, &self.label_column);
            if self.label_mode.label_of(cell) != Some(label) {
                return false;
            }
        }

        if needle.is_empty() {
            return true;
        }
        self.search_columns.iter().any(|col| {
            table
                .value(index, col)
                .to_string()
                .to_lowercase()
                .contains(needle)
        })
    }
}

/// Return indices of rows that pass the filter, in source order.
pub fn filtered_indices(table: &Table, filter: &RowFilter) -> Vec<usize> {
    let needle = filter.query.trim().to_lowercase();
    (0..table.len())
        .filter(|&i| filter.matches(table, i, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_str, LoadOptions};

    fn reviews() -> Table {
        parse_str(
            "id,game,text,sentiment,flag\n\
             1,Portal,Brilliant puzzles,positive,\n\
             2,Portal,buy now https://spam,negative,has_link\n\
             3,Dota 2,ok I guess,neutral,\n\
             4,Dota 2,LAG LAG LAG LAG LAG,negative,\"all_caps,short_spam\"\n",
            &LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let table = reviews();
        assert_eq!(filtered_indices(&table, &RowFilter::for_reviews()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn flag_filter_modes() {
        let table = reviews();
        let mut filter = RowFilter::for_reviews();
        filter.flag = FlagFilter::Has;
        assert_eq!(filtered_indices(&table, &filter), vec![1, 3]);
        filter.flag = FlagFilter::None;
        assert_eq!(filtered_indices(&table, &filter), vec![0, 2]);
    }

    #[test]
    fn query_is_case_insensitive_across_columns() {
        let table = reviews();
        let mut filter = RowFilter::for_reviews();
        filter.query = "  DOTA ".into();
        assert_eq!(filtered_indices(&table, &filter), vec![2, 3]);
        filter.query = "caps".into();
        assert_eq!(filtered_indices(&table, &filter), vec![3]);
    }

    #[test]
    fn label_filter_uses_sentiment_column() {
        let table = reviews();
        let mut filter = RowFilter::for_reviews();
        filter.label = Some(SentimentLabel::Negative);
        assert_eq!(filtered_indices(&table, &filter), vec![1, 3]);
    }

    #[test]
    fn label_filter_reads_binary_predictions() {
        let table = parse_str(
            "text,pred\ngreat,1\nawful,0\nunsure,\nodd,0.5\nfine,1\n",
            &LoadOptions::default(),
        )
        .unwrap();
        let mut filter = RowFilter {
            label: Some(SentimentLabel::Positive),
            label_column: "pred".into(),
            ..RowFilter::for_reviews()
        };
        assert!(filtered_indices(&table, &filter).is_empty());

        filter.label_mode = LabelMode::Prediction;
        assert_eq!(filtered_indices(&table, &filter), vec![0, 4]);
        filter.label = Some(SentimentLabel::Negative);
        assert_eq!(filtered_indices(&table, &filter), vec![1]);
    }
}
