use serde::{Deserialize, Serialize};

use super::SparseRow;
use crate::app::errors::{AppError, AppResult};

/// Two-class multinomial Naive Bayes. Class 0 is "not persuasive", class 1
/// is "persuasive".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
    pub alpha: f64,
    pub class_count: [f64; 2],
    pub class_log_prior: [f64; 2],
    /// `feature_log_prob[class][feature]`
    pub feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    pub fn fit(rows: &[SparseRow], labels: &[bool], n_features: usize, alpha: f64) -> AppResult<Self> {
        if rows.len() != labels.len() {
            return Err(AppError::Validation(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let mut class_count: [f64; 2] = [0.0; 2];
        let mut feature_count = [vec![0.0; n_features], vec![0.0; n_features]];
        for (row, label) in rows.iter().zip(labels) {
            let class = usize::from(*label);
            class_count[class] += 1.0;
            for (idx, value) in row {
                feature_count[class][*idx] += value;
            }
        }

        if class_count.iter().any(|c| *c == 0.0) {
            return Err(AppError::InsufficientData(
                "training labels contain a single class".to_string(),
            ));
        }

        let total = class_count[0] + class_count[1];
        let class_log_prior = class_count.map(|c| (c / total).ln());
        let feature_log_prob: [Vec<f64>; 2] = feature_count.map(|counts| {
            let smoothed_total = counts.iter().sum::<f64>() + alpha * n_features as f64;
            counts
                .iter()
                .map(|c| ((c + alpha) / smoothed_total).ln())
                .collect()
        });

        Ok(Self {
            alpha,
            class_count,
            class_log_prior,
            feature_log_prob,
        })
    }

    fn joint_log_likelihood(&self, row: &SparseRow) -> [f64; 2] {
        [0, 1].map(|class| {
            self.class_log_prior[class]
                + row
                    .iter()
                    .filter_map(|(idx, v)| self.feature_log_prob[class].get(*idx).map(|p| p * v))
                    .sum::<f64>()
        })
    }

    /// Probability of class 1 for one tf-idf row.
    pub fn positive_probability(&self, row: &SparseRow) -> f64 {
        let [neg, pos] = self.joint_log_likelihood(row);
        let max = neg.max(pos);
        let log_norm = max + ((neg - max).exp() + (pos - max).exp()).ln();
        (pos - log_norm).exp()
    }

    pub fn n_features(&self) -> usize {
        self.feature_log_prob[0].len()
    }
}
