use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use super::model::is_numeric_literal;
use super::model::{Row, Table, Value};
use crate::backend::http;
use crate::error::LoadError;
use crate::jobs::CancelToken;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parsing switches shared by every panel that loads delimited text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// First line names the columns.
    pub has_header: bool,
    /// Convert numeric-looking cells to [`Value::Number`].
    pub infer_types: bool,
    /// Drop rows whose value for this column is absent.
    pub required_column: Option<String>,
    pub delimiter: u8,
    /// Upper bound on a fetched body.
    pub max_bytes: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            infer_types: true,
            required_column: None,
            delimiter: b',',
            max_bytes: http::DEFAULT_MAX_BYTES,
        }
    }
}

impl LoadOptions {
    pub fn require(mut self, column: impl Into<String>) -> Self {
        self.required_column = Some(column.into());
        self
    }
}

/// Where a delimited resource comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl Source {
    /// Treat `http://` / `https://` as URLs and everything else as a path.
    pub fn parse(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(reference.to_string())
        } else {
            Source::Path(PathBuf::from(reference))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Url(url) => url.clone(),
            Source::Path(path) => path.display().to_string(),
            Source::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Fetch and parse a delimited resource.
pub fn load(source: &Source, options: &LoadOptions) -> Result<Table, LoadError> {
    load_cancellable(source, options, &CancelToken::default())
}

/// Like [`load`], but gives up with [`LoadError::Cancelled`] once `cancel`
/// is signalled.
pub fn load_cancellable(
    source: &Source,
    options: &LoadOptions,
    cancel: &CancelToken,
) -> Result<Table, LoadError> {
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    let bytes = fetch_bytes(source, options.max_bytes)?;
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    if looks_like_markup(&bytes) {
        return Err(LoadError::Format {
            resource: source.describe(),
        });
    }
    let table = parse_bytes(&bytes, options)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        source.describe()
    );
    Ok(table)
}

/// Fetch the raw bytes of a resource without parsing them.
pub fn fetch_bytes(source: &Source, max_bytes: usize) -> Result<Vec<u8>, LoadError> {
    match source {
        Source::Bytes(bytes) => Ok(bytes.clone()),
        Source::Path(path) => {
            let bytes = std::fs::read(path).map_err(|e| LoadError::fetch(source.describe(), e))?;
            if bytes.len() > max_bytes {
                return Err(LoadError::fetch(
                    source.describe(),
                    format!("file exceeds {max_bytes} bytes"),
                ));
            }
            Ok(bytes)
        }
        Source::Url(url) => {
            debug!("GET {url}");
            let response = match http::agent().get(url).call() {
                Ok(response) => response,
                Err(ureq::Error::Status(code, _)) => {
                    return Err(LoadError::fetch(url.as_str(), format!("HTTP status {code}")));
                }
                Err(e) => return Err(LoadError::fetch(url.as_str(), e)),
            };
            if http::is_html_content_type(&response) {
                return Err(LoadError::Format {
                    resource: url.clone(),
                });
            }
            http::read_response_bytes(response, max_bytes)
                .map_err(|e| LoadError::fetch(url.as_str(), e))
        }
    }
}

/// Parse delimited text that is already in memory.
pub fn parse_str(text: &str, options: &LoadOptions) -> Result<Table, LoadError> {
    parse_bytes(text.as_bytes(), options)
}

/// Parse delimited bytes into a [`Table`].
///
/// * Short rows are padded with [`Value::Absent`].
/// * Cells past the header width are dropped.
/// * Fully blank rows, and rows missing `required_column`, are skipped.
pub fn parse_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Table, LoadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(bytes);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Parse {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push((line, record));
    }

    let columns: Vec<String> = if options.has_header {
        if records.is_empty() {
            return Ok(Table::default());
        }
        let (_, header) = records.remove(0);
        unique_headers(header.iter().map(|h| h.trim().to_string()))
    } else {
        let width = records.iter().map(|(_, r)| r.len()).max().unwrap_or(0);
        (0..width).map(|i| i.to_string()).collect()
    };

    Ok(build_table(columns, records, options))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Rows are keyed by column name, so repeated names get `_1`, `_2`, ...
/// suffixes (skipping any name already taken).
fn unique_headers(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{name}_{n}");
        }
        if n > 0 {
            warn!("duplicate column '{name}' renamed to '{candidate}'");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn build_table(
    columns: Vec<String>,
    records: Vec<(u64, csv::StringRecord)>,
    options: &LoadOptions,
) -> Table {
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for (line, record) in records {
        if record.len() > columns.len() {
            warn!(
                "line {line}: {} cells but only {} columns, extra cells ignored",
                record.len(),
                columns.len()
            );
        }
        let row: Row = columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let cell = record.get(i).unwrap_or("");
                (col.clone(), coerce_cell(cell, options.infer_types))
            })
            .collect();

        if row.values().all(Value::is_absent) {
            dropped += 1;
            continue;
        }
        if let Some(required) = &options.required_column {
            if row.get(required).map_or(true, Value::is_absent) {
                dropped += 1;
                continue;
            }
        }
        rows.push(row);
    }

    if dropped > 0 {
        debug!("Dropped {dropped} empty or incomplete rows");
    }
    Table { columns, rows }
}

/// Map one raw cell to a [`Value`].
pub fn coerce_cell(cell: &str, infer_types: bool) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Absent;
    }
    if infer_types && is_numeric_literal(trimmed) {
        // Literals that overflow to infinity stay text so they export as written.
        if let Some(v) = trimmed.parse::<f64>().ok().filter(|v| v.is_finite()) {
            return Value::Number(v);
        }
    }
    Value::Text(cell.to_string())
}


/// Guard against parsing an HTML error page as data.
pub fn looks_like_markup(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head: Vec<u8> = bytes[start..]
        .iter()
        .take(16)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    head.starts_with(b"<!doctype") || head.starts_with(b"<html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::http::serve_once;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn quoted_delimiter_and_numeric_coercion() {
        let table = parse_str(
            "text,pred\n\"hello, world\",1\n\"bye\",0\n",
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(table.columns, vec!["text", "pred"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "text"), &text("hello, world"));
        assert_eq!(table.value(0, "pred"), &Value::Number(1.0));
        assert_eq!(table.value(1, "text"), &text("bye"));
        assert_eq!(table.value(1, "pred"), &Value::Number(0.0));
    }

    #[test]
    fn short_rows_pad_and_blank_rows_drop() {
        let table = parse_str("a,b,c\n1\n,,\n2,x,3\n", &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "a"), &Value::Number(1.0));
        assert_eq!(table.value(0, "b"), &Value::Absent);
        assert_eq!(table.value(0, "c"), &Value::Absent);
        assert_eq!(table.rows[0].len(), 3);
    }

    #[test]
    fn required_column_filters_rows() {
        let options = LoadOptions::default().require("text");
        let table = parse_str("id,text\n1,great\n2,\n3,bad\n", &options).unwrap();
        let ids: Vec<_> = table.rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::Number(1.0), Value::Number(3.0)]);
    }

    #[test]
    fn infer_types_off_keeps_text() {
        let options = LoadOptions {
            infer_types: false,
            ..LoadOptions::default()
        };
        let table = parse_str("n\n42\n", &options).unwrap();
        assert_eq!(table.value(0, "n"), &text("42"));
    }

    #[test]
    fn numeric_literal_shapes() {
        for ok in ["1", "-0.6", "3.", ".5", "1e-3", "+2E10"] {
            assert!(is_numeric_literal(ok), "{ok}");
        }
        for bad in ["1,000", "0x10", "NaN", "inf", "1.2.3", "e5", "12abc"] {
            assert!(!is_numeric_literal(bad), "{bad}");
        }
    }

    #[test]
    fn duplicate_headers_keep_every_cell() {
        let table = parse_str("a,a,a_1,a\n1,2,3,4\n", &LoadOptions::default()).unwrap();
        assert_eq!(table.columns, vec!["a", "a_1", "a_1_1", "a_2"]);
        assert_eq!(table.value(0, "a"), &Value::Number(1.0));
        assert_eq!(table.value(0, "a_1"), &Value::Number(2.0));
        assert_eq!(table.value(0, "a_1_1"), &Value::Number(3.0));
        assert_eq!(table.value(0, "a_2"), &Value::Number(4.0));
    }

    #[test]
    fn overflowing_literals_stay_text() {
        let table = parse_str("x\n1e999\n-1e400\n", &LoadOptions::default()).unwrap();
        assert_eq!(table.value(0, "x"), &text("1e999"));
        assert_eq!(table.value(1, "x"), &text("-1e400"));
    }

    #[test]
    fn headerless_columns_are_positional() {
        let options = LoadOptions {
            has_header: false,
            ..LoadOptions::default()
        };
        let table = parse_str("1200,300\n260,1240,7\n", &options).unwrap();
        assert_eq!(table.columns, vec!["0", "1", "2"]);
        assert_eq!(table.value(0, "2"), &Value::Absent);
        assert_eq!(table.value(1, "2"), &Value::Number(7.0));
    }

    #[test]
    fn bom_and_header_whitespace_are_stripped() {
        let table = parse_str("\u{feff} text , pred\nok,1\n", &LoadOptions::default()).unwrap();
        assert_eq!(table.columns, vec!["text", "pred"]);
    }

    #[test]
    fn html_body_is_a_format_error() {
        let source = Source::Bytes(b"  <!DOCTYPE html><html><body>404</body></html>".to_vec());
        let err = load(&source, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = parse_bytes(b"a,b\n1,\xff\xfe\n", &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let source = Source::Path(PathBuf::from("/definitely/not/here.csv"));
        let err = load(&source, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let token = CancelToken::default();
        token.cancel();
        let source = Source::Bytes(b"a\n1\n".to_vec());
        let err = load_cancellable(&source, &LoadOptions::default(), &token).unwrap_err();
        assert_eq!(err, LoadError::Cancelled);
    }

    #[test]
    fn url_source_loads_csv() {
        let body = "game,sentiment\nPortal,positive\n";
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ));
        let table = load(&Source::Url(url), &LoadOptions::default()).unwrap();
        assert_eq!(table.value(0, "game"), &text("Portal"));
    }

    #[test]
    fn url_error_status_is_a_fetch_error() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string());
        let err = load(&Source::Url(url), &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::Fetch { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn source_parse_distinguishes_urls() {
        assert!(matches!(Source::parse("HTTPS://x/y.csv"), Source::Url(_)));
        assert!(matches!(Source::parse("data/y.csv"), Source::Path(_)));
    }
}
