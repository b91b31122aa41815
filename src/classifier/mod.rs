//! Persuasiveness classifier: stemmed term counts, tf-idf weighting and a
//! multinomial Naive Bayes model.
//!
//! Fitting happens offline (`theodore fit`); the fitted stages are published
//! through [`crate::models::ArtifactStore`] and loaded read-only for every
//! prediction.

mod analyzer;
mod naive_bayes;
mod pipeline;
mod tfidf;
mod vectorizer;

pub use pipeline::{corpus_from_table, fit, FittedPipeline, Label, Prediction, TrainingSummary};

/// Sparse feature row: `(feature index, value)` pairs in ascending index order.
pub type SparseRow = Vec<(usize, f64)>;
