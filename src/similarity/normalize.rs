use crate::{config::MissingPolicy, features::EntityTable};

/// Z-scored feature matrix over the retained numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeatures {
    pub columns: Vec<String>,
    /// One vector per table row, aligned with `columns`.
    pub rows: Vec<Vec<f64>>,
}

struct ColumnStats {
    mean: f64,
    std: f64,
}

/// Mean and sample standard deviation (n - 1) over the finite values.
/// `None` when there are fewer than two values.
fn column_stats(values: impl Iterator<Item = f64>) -> Option<ColumnStats> {
    let values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(ColumnStats {
        mean,
        std: var.sqrt(),
    })
}

/// Rescales every numeric column not in `excluded` to `(x - mean) / std`
/// over the whole table.
///
/// Columns with fewer than two values or zero variance are dropped. Missing
/// cells follow `missing`: imputed to the mean (z = 0) or the column is
/// dropped altogether.
pub fn zscore(table: &EntityTable, excluded: &[String], missing: MissingPolicy) -> NormalizedFeatures {
    let mut columns = vec![];
    let mut stats = vec![];

    for (col, name) in table.numeric_columns().iter().enumerate() {
        if excluded.contains(name) {
            continue;
        }

        let has_missing = table.numeric_values(col).any(|v| !v.is_finite());
        if has_missing && missing == MissingPolicy::DropColumn {
            log::debug!("dropping column {name:?}: has missing values");
            continue;
        }

        match column_stats(table.numeric_values(col)) {
            Some(s) if s.std > 0.0 && s.std.is_finite() => {
                columns.push(name.clone());
                stats.push((col, s));
            }
            _ => log::debug!("dropping column {name:?}: no variance"),
        }
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            stats
                .iter()
                .map(|(col, s)| {
                    let value = row.numeric[*col];
                    if value.is_finite() {
                        (value - s.mean) / s.std
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();

    NormalizedFeatures { columns, rows }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
