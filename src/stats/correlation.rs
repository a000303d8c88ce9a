//! Pearson correlation over the numeric columns of a table.
//!
//! Pairs use pairwise-complete observations: a row is skipped for a pair
//! when either of the two values is missing or non-finite, without
//! affecting other pairs.

use serde::{Deserialize, Serialize};

use crate::data::model::{Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationOptions {
    /// At most this many numeric columns, in header order.
    pub max_columns: usize,
    /// Only the first N rows are sampled.
    pub sample_rows: usize,
    /// Floor applied to `std_i * std_j`.
    pub min_denominator: f64,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            max_columns: 20,
            sample_rows: 1000,
            min_denominator: 1e-9,
        }
    }
}

/// Square, symmetric matrix indexed by `columns`; the diagonal is 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Columns whose present values are all numbers, capped at `max_columns`.
/// A column with no present value at all is not numeric.
pub fn numeric_columns(table: &Table, max_columns: usize) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|col| {
            let mut seen = false;
            for row in &table.rows {
                match row.get(col.as_str()) {
                    None | Some(Value::Absent) => {}
                    Some(v) => {
                        if v.as_f64().is_none() {
                            return false;
                        }
                        seen = true;
                    }
                }
            }
            seen
        })
        .take(max_columns)
        .cloned()
        .collect()
}

/// Pearson correlation matrix over the table's numeric columns.
pub fn correlation_matrix(table: &Table, options: &CorrelationOptions) -> CorrelationMatrix {
    let columns = numeric_columns(table, options.max_columns);
    let samples: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|col| {
            table
                .rows
                .iter()
                .take(options.sample_rows)
                .map(|row| row.get(col).and_then(Value::as_f64).filter(|v| v.is_finite()))
                .collect()
        })
        .collect();

    let n = columns.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&samples[i], &samples[j], options.min_denominator);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix { columns, values }
}

/// Correlation of two aligned columns over rows where both are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>], min_denominator: f64) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }

    let std_x = (var_x / n).sqrt();
    let std_y = (var_y / n).sqrt();
    let r = (cov / n) / (std_x * std_y).max(min_denominator);
    r.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_str, LoadOptions};

    fn table(text: &str) -> Table {
        parse_str(text, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn numeric_detection_skips_text_and_empty_columns() {
        let t = table("text,helpful,funny,blank\nfoo,1,,\nbar,2,3,\n");
        assert_eq!(numeric_columns(&t, 20), vec!["helpful", "funny"]);
        assert_eq!(numeric_columns(&t, 1), vec!["helpful"]);
    }

    #[test]
    fn special_float_words_are_not_numeric() {
        let t = table("score,ratio\nNaN,0.5\ninf,1.5\n");
        assert_eq!(numeric_columns(&t, 20), vec!["ratio"]);
        let raw = parse_str(
            "score,ratio\ninfinity,0.5\n1,1.5\n",
            &LoadOptions {
                infer_types: false,
                ..LoadOptions::default()
            },
        )
        .unwrap();
        assert_eq!(numeric_columns(&raw, 20), vec!["ratio"]);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let t = table("a,b,c\n1,2,9\n2,4,7\n3,5,8\n4,9,1\n5,8,3\n");
        let m = correlation_matrix(&t, &CorrelationOptions::default());
        assert_eq!(m.columns.len(), 3);
        for i in 0..3 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
                assert!((-1.0..=1.0).contains(&m.values[i][j]));
            }
        }
    }

    #[test]
    fn perfect_linear_relationships() {
        let t = table("x,up,down\n1,10,-1\n2,20,-2\n3,30,-3\n");
        let m = correlation_matrix(&t, &CorrelationOptions::default());
        assert!((m.get("x", "up").unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get("x", "down").unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_correlates_zero() {
        let t = table("k,x,y\n5,1,2\n5,2,1\n5,3,5\n");
        let m = correlation_matrix(&t, &CorrelationOptions::default());
        assert_eq!(m.get("k", "k"), Some(1.0));
        assert_eq!(m.get("k", "x"), Some(0.0));
        assert_eq!(m.get("y", "k"), Some(0.0));
    }

    #[test]
    fn missing_values_only_affect_their_pair() {
        // Row 3 has no `c`; the (a, b) pair still uses all four rows.
        let t = table("a,b,c\n1,1,4\n2,2,3\n3,3,\n4,5,1\n");
        let full = pearson(
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            &[Some(1.0), Some(2.0), Some(3.0), Some(5.0)],
            1e-9,
        );
        let m = correlation_matrix(&t, &CorrelationOptions::default());
        assert!((m.get("a", "b").unwrap() - full).abs() < 1e-12);
        let ac = pearson(&[Some(1.0), Some(2.0), Some(4.0)], &[Some(4.0), Some(3.0), Some(1.0)], 1e-9);
        assert!((m.get("a", "c").unwrap() - ac).abs() < 1e-12);
    }

    #[test]
    fn sample_cap_limits_rows() {
        let t = table("a,b\n1,1\n2,2\n3,-50\n");
        let options = CorrelationOptions {
            sample_rows: 2,
            ..CorrelationOptions::default()
        };
        let m = correlation_matrix(&t, &options);
        assert!((m.get("a", "b").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_numeric_columns_gives_empty_matrix() {
        let t = table("text\nhello\n");
        assert!(correlation_matrix(&t, &CorrelationOptions::default()).is_empty());
    }
}
