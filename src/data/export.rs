use std::io::Write;

use anyhow::{Context, Result};

use super::model::Table;

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Serialize a table as delimited text in header order.
///
/// Fields containing the delimiter, a quote or a line break are quoted;
/// absent cells become empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    out.write_record(&table.columns)
        .context("writing CSV header")?;
    for (i, row) in table.rows.iter().enumerate() {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|col| row.get(col).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        out.write_record(&record)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    out.flush().context("flushing CSV output")?;
    Ok(())
}

/// Comma-separated export held in memory.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf, b',')?;
    String::from_utf8(buf).context("CSV output was not UTF-8")
}

// ---------------------------------------------------------------------------
// Download naming
// ---------------------------------------------------------------------------

/// Deterministic file name for a download, e.g.
/// `download_filename("Hollow Knight", "reviews") == "Hollow_Knight_reviews.csv"`.
pub fn download_filename(title: &str, suffix: &str) -> String {
    let stem = sanitize(title);
    let stem = if stem.is_empty() { "export".to_string() } else { stem };
    let suffix = sanitize(suffix);
    if suffix.is_empty() {
        format!("{stem}.csv")
    } else {
        format!("{stem}_{suffix}.csv")
    }
}

fn sanitize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}
