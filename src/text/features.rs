//! Best-effort parser for "top features" reports written by the training
//! backend.
//!
//! Accepted line shapes (one feature per line):
//!
//! ```text
//! Top positive features:
//! good,0.8
//! great	0.61
//! 1) fun (0.5)
//! Top negative features:
//! boring: -0.3
//! refund -0.21
//! ```
//!
//! A section header fixes the polarity of the lines after it; without one
//! the sign of the weight decides. Lines that match none of the shapes are
//! skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::loader::{self, Source};
use crate::data::model::{Row, Table, Value};
use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Pos,
    Neg,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Polarity::Pos => "pos",
            Polarity::Neg => "neg",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFeatureEntry {
    pub term: String,
    pub weight: f64,
    pub polarity: Polarity,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("feature report is empty")]
    Empty,
    #[error("feature report is not valid UTF-8")]
    NotUtf8,
    #[error(transparent)]
    Load(#[from] LoadError),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn line_pattern() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^([^,;\t:]+)[,;\t:\s]+([+-]?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)$")
            .expect("valid feature line regex")
    })
}

fn ordinal_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^\d+\)\s*").expect("valid ordinal regex"))
}

/// Parse a report into unique `(term, polarity)` entries sorted by
/// descending absolute weight.
pub fn parse_top_features(raw: &str) -> Result<Vec<TopFeatureEntry>, FeatureError> {
    if raw.trim().is_empty() {
        return Err(FeatureError::Empty);
    }

    let mut section: Option<Polarity> = None;
    let mut best: HashMap<(String, Polarity), (usize, f64)> = HashMap::new();
    let mut order = 0usize;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if lower.starts_with("top positive") {
            section = Some(Polarity::Pos);
            continue;
        }
        if lower.starts_with("top negative") {
            section = Some(Polarity::Neg);
            continue;
        }

        let cleaned = ordinal_prefix().replace(line, "").replace(['(', ')'], "");
        let Some(caps) = line_pattern().captures(cleaned.trim()) else {
            continue;
        };
        let term = caps[1].trim().to_string();
        let Ok(weight) = caps[2].parse::<f64>() else {
            continue;
        };
        if term.is_empty() || !weight.is_finite() {
            continue;
        }

        let polarity = section.unwrap_or(if weight >= 0.0 { Polarity::Pos } else { Polarity::Neg });
        let slot = best.entry((term, polarity)).or_insert((order, weight));
        if weight.abs() > slot.1.abs() {
            slot.1 = weight;
        }
        order += 1;
    }

    let mut entries: Vec<(usize, TopFeatureEntry)> = best
        .into_iter()
        .map(|((term, polarity), (first_seen, weight))| {
            (first_seen, TopFeatureEntry { term, weight, polarity })
        })
        .collect();
    // First appearance breaks ties so equal weights keep report order.
    entries.sort_by(|(ia, a), (ib, b)| {
        b.weight
            .abs()
            .total_cmp(&a.weight.abs())
            .then_with(|| ia.cmp(ib))
    });
    Ok(entries.into_iter().map(|(_, e)| e).collect())
}

/// Fetch a report by URL or path and parse it.
pub fn load_top_features(source: &Source, max_bytes: usize) -> Result<Vec<TopFeatureEntry>, FeatureError> {
    let bytes = loader::fetch_bytes(source, max_bytes)?;
    if loader::looks_like_markup(&bytes) {
        return Err(LoadError::Format {
            resource: source.describe(),
        }
        .into());
    }
    let text = String::from_utf8(bytes).map_err(|_| FeatureError::NotUtf8)?;
    parse_top_features(&text)
}

// ---------------------------------------------------------------------------
// Selection and export
// ---------------------------------------------------------------------------

/// Search box + "Top N" selector over one polarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureQuery {
    pub search: String,
    pub top_n: usize,
}

impl Default for FeatureQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            top_n: 20,
        }
    }
}

/// Entries of `polarity` whose term contains the search text
/// (case-insensitive), first `top_n` in weight order.
pub fn select<'a>(
    entries: &'a [TopFeatureEntry],
    polarity: Polarity,
    query: &FeatureQuery,
) -> Vec<&'a TopFeatureEntry> {
    let needle = query.search.to_lowercase();
    entries
        .iter()
        .filter(|e| e.polarity == polarity)
        .filter(|e| needle.is_empty() || e.term.to_lowercase().contains(&needle))
        .take(query.top_n)
        .collect()
}

/// `polarity,term,weight` table for CSV export.
pub fn features_to_table(entries: &[TopFeatureEntry]) -> Table {
    let columns = vec!["polarity".to_string(), "term".to_string(), "weight".to_string()];
    let rows = entries
        .iter()
        .map(|e| {
            Row::from([
                ("polarity".to_string(), Value::Text(e.polarity.to_string())),
                ("term".to_string(), Value::Text(e.term.clone())),
                ("weight".to_string(), Value::Number(e.weight)),
            ])
        })
        .collect();
    Table { columns, rows }
}
