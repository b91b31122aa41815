use serde::{Deserialize, Serialize};

use super::SparseRow;

/// Smoothed inverse document frequency weights with L2 row normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfTransformer {
    pub idf: Vec<f64>,
}

impl TfidfTransformer {
    /// `idf(t) = ln((1 + n) / (1 + df(t))) + 1` over `n_features` columns.
    pub fn fit(rows: &[SparseRow], n_features: usize) -> Self {
        let mut df = vec![0usize; n_features];
        for row in rows {
            for (idx, count) in row {
                if *count > 0.0 {
                    df[*idx] += 1;
                }
            }
        }

        let n = rows.len() as f64;
        let idf = df
            .into_iter()
            .map(|df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        Self { idf }
    }

    pub fn transform(&self, row: &SparseRow) -> SparseRow {
        let weighted: SparseRow = row
            .iter()
            .filter_map(|(idx, count)| self.idf.get(*idx).map(|idf| (*idx, count * idf)))
            .collect();

        let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return weighted;
        }
        weighted.into_iter().map(|(idx, v)| (idx, v / norm)).collect()
    }
}
