use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::{Row, Value};

// ---------------------------------------------------------------------------
// SentimentLabel
// ---------------------------------------------------------------------------

/// Closed set of sentiment classes. Anything else in the data is an
/// unrecognized label and is counted in the `other` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_text().and_then(Self::parse)
    }

    /// Binary classifier output: `1` positive, `0` negative.
    pub fn from_prediction(value: &Value) -> Option<Self> {
        match value.as_f64() {
            Some(v) if v == 1.0 => Some(SentimentLabel::Positive),
            Some(v) if v == 0.0 => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

/// How a label column is read: sentiment words or 1/0 predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    #[default]
    Text,
    Prediction,
}

impl LabelMode {
    pub fn label_of(self, value: &Value) -> Option<SentimentLabel> {
        match self {
            LabelMode::Text => SentimentLabel::from_value(value),
            LabelMode::Prediction => SentimentLabel::from_prediction(value),
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown sentiment label '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// AggregateSummary
// ---------------------------------------------------------------------------

/// Sentiment counts for a row set. Always satisfies
/// `positive + neutral + negative + other == total_rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AggregateSummary {
    pub total_rows: usize,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    pub other_count: usize,
    pub positive_rate_percent: u8,
}

impl AggregateSummary {
    fn from_counts(positive: usize, neutral: usize, negative: usize, other: usize) -> Self {
        let total = positive
            .saturating_add(neutral)
            .saturating_add(negative)
            .saturating_add(other);
        Self {
            total_rows: total,
            positive_count: positive,
            neutral_count: neutral,
            negative_count: negative,
            other_count: other,
            positive_rate_percent: positive_rate_percent(positive, total),
        }
    }

    fn add(&mut self, label: Option<SentimentLabel>) {
        match label {
            Some(SentimentLabel::Positive) => self.positive_count += 1,
            Some(SentimentLabel::Neutral) => self.neutral_count += 1,
            Some(SentimentLabel::Negative) => self.negative_count += 1,
            None => self.other_count += 1,
        }
        self.total_rows += 1;
        self.positive_rate_percent = positive_rate_percent(self.positive_count, self.total_rows);
    }
}

/// `round(100 * positive / total)`, 0 for an empty set, clamped to 0..=100.
pub fn positive_rate_percent(positive: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * positive as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Tally rows by the label in `label_column`.
pub fn tally<'a>(rows: impl IntoIterator<Item = &'a Row>, label_column: &str) -> AggregateSummary {
    let mut summary = AggregateSummary::default();
    for row in rows {
        summary.add(row.get(label_column).and_then(SentimentLabel::from_value));
    }
    summary
}

/// Tally binary classifier output: `1` positive, `0` negative, anything
/// else unrecognized.
pub fn tally_predictions<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    pred_column: &str,
) -> AggregateSummary {
    tally_with(rows, pred_column, LabelMode::Prediction)
}

/// Tally rows by `label_column`, read according to `mode`.
pub fn tally_with<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    label_column: &str,
    mode: LabelMode,
) -> AggregateSummary {
    let mut summary = AggregateSummary::default();
    for row in rows {
        summary.add(row.get(label_column).and_then(|v| mode.label_of(v)));
    }
    summary
}

// ---------------------------------------------------------------------------
// Pre-aggregated rows
// ---------------------------------------------------------------------------

/// Column names of a pre-aggregated per-title row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountFields {
    pub total: String,
    pub positive: String,
    pub neutral: String,
    pub negative: String,
    /// Optional 0..1 fraction; when present and non-zero it wins over the
    /// computed rate.
    pub positive_rate: Option<String>,
}

impl Default for CountFields {
    fn default() -> Self {
        Self {
            total: "total_reviews".into(),
            positive: "positive".into(),
            neutral: "neutral".into(),
            negative: "negative".into(),
            positive_rate: Some("positive_rate".into()),
        }
    }
}

/// Per-field cap on pre-aggregated counts; four capped fields still sum
/// without overflow.
const MAX_COUNT: usize = usize::MAX / 4;

/// Summary from a designated count row such as a `provider_agg.csv` line.
pub fn summary_from_counts(row: &Row, fields: &CountFields) -> AggregateSummary {
    let count = |col: &str| -> usize {
        row.get(col)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| (v.round() as usize).min(MAX_COUNT))
            .unwrap_or(0)
    };
    let positive = count(&fields.positive);
    let neutral = count(&fields.neutral);
    let negative = count(&fields.negative);
    let labelled = positive + neutral + negative;
    let total = count(&fields.total).max(labelled);

    let mut summary = AggregateSummary::from_counts(positive, neutral, negative, total - labelled);
    let rate = fields
        .positive_rate
        .as_deref()
        .and_then(|col| row.get(col))
        .and_then(Value::as_f64)
        .filter(|r| r.is_finite() && *r != 0.0);
    if let Some(rate) = rate {
        summary.positive_rate_percent = (rate * 100.0).round().clamp(0.0, 100.0) as u8;
    }
    summary
}

// ---------------------------------------------------------------------------
// Per-group aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    #[serde(flatten)]
    pub summary: AggregateSummary,
}

/// Tally per distinct value of `group_column` (rows with no group are
/// skipped), ordered by total descending then name.
pub fn group_by<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    group_column: &str,
    label_column: &str,
) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<String, AggregateSummary> = BTreeMap::new();
    for row in rows {
        let group = match row.get(group_column) {
            Some(v) if !v.is_absent() => v.to_string().trim().to_string(),
            _ => continue,
        };
        groups
            .entry(group)
            .or_default()
            .add(row.get(label_column).and_then(SentimentLabel::from_value));
    }

    let mut out: Vec<GroupSummary> = groups
        .into_iter()
        .map(|(group, summary)| GroupSummary { group, summary })
        .collect();
    out.sort_by(|a, b| {
        b.summary
            .total_rows
            .cmp(&a.summary.total_rows)
            .then_with(|| a.group.cmp(&b.group))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_str, LoadOptions};

    fn load(text: &str) -> crate::data::model::Table {
        parse_str(text, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn tally_counts_every_bucket() {
        let table = load(
            "sentiment\npositive\nPositive \nneutral\nnegative\nmixed\n\n,\n",
        );
        let s = tally(&table.rows, "sentiment");
        assert_eq!(s.positive_count, 2);
        assert_eq!(s.neutral_count, 1);
        assert_eq!(s.negative_count, 1);
        assert_eq!(s.other_count, 1);
        assert_eq!(s.total_rows, 5);
        assert_eq!(s.positive_rate_percent, 40);
    }

    #[test]
    fn buckets_always_sum_to_total() {
        let table = load("sentiment,x\npositive,1\n,2\n42,3\nnegative,4\n");
        let s = tally(&table.rows, "sentiment");
        assert_eq!(
            s.positive_count + s.neutral_count + s.negative_count + s.other_count,
            s.total_rows
        );
        assert_eq!(s.other_count, 2);
    }

    #[test]
    fn positive_rate_rounds_and_bounds() {
        assert_eq!(positive_rate_percent(0, 0), 0);
        assert_eq!(positive_rate_percent(1, 3), 33);
        assert_eq!(positive_rate_percent(2, 3), 67);
        assert_eq!(positive_rate_percent(1, 200), 1);
        assert_eq!(positive_rate_percent(1, 201), 0);
        assert_eq!(positive_rate_percent(5, 5), 100);
    }

    #[test]
    fn empty_rows_give_zero_summary() {
        let s = tally(std::iter::empty(), "sentiment");
        assert_eq!(s, AggregateSummary::default());
    }

    #[test]
    fn predictions_are_binary() {
        let table = load("text,pred\na,1\nb,0\nc,1\nd,\ne,2\n");
        let s = tally_predictions(&table.rows, "pred");
        assert_eq!((s.positive_count, s.negative_count, s.other_count), (2, 1, 2));
        assert_eq!(s.positive_rate_percent, 40);
    }

    #[test]
    fn count_row_prefers_explicit_rate() {
        let table = load(
            "game,total_reviews,positive,neutral,negative,positive_rate\n\
             A,10,7,1,1,0.6543\n\
             B,4,1,0,3,0\n",
        );
        let a = summary_from_counts(&table.rows[0], &CountFields::default());
        assert_eq!(a.total_rows, 10);
        assert_eq!(a.other_count, 1);
        assert_eq!(a.positive_rate_percent, 65);
        let b = summary_from_counts(&table.rows[1], &CountFields::default());
        assert_eq!(b.positive_rate_percent, 25);
    }

    #[test]
    fn huge_counts_are_capped() {
        let row = Row::from([
            ("total_reviews".to_string(), Value::Number(1e30)),
            ("positive".to_string(), Value::Number(1e30)),
            ("neutral".to_string(), Value::Number(1e30)),
            ("negative".to_string(), Value::Number(1e30)),
        ]);
        let summary = summary_from_counts(&row, &CountFields::default());
        assert_eq!(summary.positive_count, MAX_COUNT);
        assert_eq!(
            summary.positive_count
                + summary.neutral_count
                + summary.negative_count
                + summary.other_count,
            summary.total_rows
        );
        assert_eq!(summary.positive_rate_percent, 33);
    }

    #[test]
    fn group_by_orders_by_volume() {
        let table = load(
            "game,sentiment\nPortal,positive\nDota,negative\nDota,positive\n,positive\nDota,neutral\n",
        );
        let groups = group_by(&table.rows, "game", "sentiment");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, "Dota");
        assert_eq!(groups[0].summary.total_rows, 3);
        assert_eq!(groups[0].summary.positive_rate_percent, 33);
        assert_eq!(groups[1].group, "Portal");
        assert_eq!(groups[1].summary.positive_rate_percent, 100);
    }
}
