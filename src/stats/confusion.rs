use serde::{Deserialize, Serialize};

use crate::data::model::{Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Raw counts.
    None,
    /// Percent of each true-class row.
    #[default]
    Row,
    /// Percent of the grand total.
    All,
}

/// Confusion matrix read from a header-less numeric CSV
/// (rows = true class, columns = predicted class).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub cells: Vec<Vec<f64>>,
}

impl ConfusionMatrix {
    /// Build from a table loaded with `has_header = false`. Non-numeric or
    /// absent cells count as 0.
    pub fn from_table(table: &Table) -> Self {
        let cells = table
            .rows
            .iter()
            .map(|row| {
                table
                    .columns
                    .iter()
                    .map(|col| row.get(col).and_then(Value::as_f64).unwrap_or(0.0))
                    .collect()
            })
            .collect();
        Self { cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Rescale the cells; zero sums divide by 1.
    pub fn normalized(&self, mode: Normalization) -> Vec<Vec<f64>> {
        match mode {
            Normalization::None => self.cells.clone(),
            Normalization::Row => self
                .cells
                .iter()
                .map(|row| {
                    let sum = nonzero(row.iter().sum());
                    row.iter().map(|v| v / sum * 100.0).collect()
                })
                .collect(),
            Normalization::All => {
                let total = nonzero(self.cells.iter().flatten().sum());
                self.cells
                    .iter()
                    .map(|row| row.iter().map(|v| v / total * 100.0).collect())
                    .collect()
            }
        }
    }

    /// Fraction of the diagonal over the total (0 for an empty matrix).
    pub fn accuracy(&self) -> f64 {
        let total: f64 = self.cells.iter().flatten().sum();
        if total == 0.0 {
            return 0.0;
        }
        let diagonal: f64 = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i))
            .sum();
        diagonal / total
    }
}

fn nonzero(sum: f64) -> f64 {
    if sum == 0.0 {
        1.0
    } else {
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_str, LoadOptions};

    fn matrix() -> ConfusionMatrix {
        let options = LoadOptions {
            has_header: false,
            ..LoadOptions::default()
        };
        ConfusionMatrix::from_table(&parse_str("1200,300\n260,1240\n", &options).unwrap())
    }

    #[test]
    fn row_normalization_sums_to_hundred() {
        let m = matrix().normalized(Normalization::Row);
        assert!((m[0][0] - 80.0).abs() < 1e-9);
        for row in &m {
            assert!((row.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn global_normalization_and_accuracy() {
        let cm = matrix();
        let m = cm.normalized(Normalization::All);
        let total: f64 = m.iter().flatten().sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((cm.accuracy() - 2440.0 / 3000.0).abs() < 1e-12);
    }

    #[test]
    fn zero_row_does_not_divide_by_zero() {
        let cm = ConfusionMatrix {
            cells: vec![vec![0.0, 0.0], vec![1.0, 3.0]],
        };
        let m = cm.normalized(Normalization::Row);
        assert_eq!(m[0], vec![0.0, 0.0]);
        assert_eq!(m[1], vec![25.0, 75.0]);
    }
}
