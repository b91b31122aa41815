use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    analyzer::Analyzer, naive_bayes::MultinomialNb, tfidf::TfidfTransformer,
    vectorizer::CountVectorizer,
};
use crate::{
    app::errors::{AppError, AppResult},
    config::ClassifierConfig,
    features::EntityTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NotPersuasive,
    Persuasive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the persuasive class
    pub probability: f64,
}

impl Prediction {
    /// e.g. `PERSUASIVE - 73.12% Probability of Persuasive Rating`.
    /// The percentage is rounded to two places and printed without trailing
    /// zeros, keeping one digit after the point (`50.0`, `73.1`).
    pub fn summary(&self) -> String {
        let verdict = match self.label {
            Label::Persuasive => "PERSUASIVE",
            Label::NotPersuasive => "NOT PERSUASIVE",
        };
        let percent = (self.probability * 10_000.0).round() / 100.0;
        format!("{verdict} - {percent:?}% Probability of Persuasive Rating")
    }
}

/// The three fitted stages, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPipeline {
    pub vectorizer: CountVectorizer,
    pub tfidf: TfidfTransformer,
    pub classifier: MultinomialNb,
}

/// Facts about a fit, recorded next to the published artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub documents: usize,
    pub vocabulary_size: usize,
    /// Median score; documents at or above it are labelled persuasive
    pub threshold: f64,
    pub persuasive: usize,
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `(text, score)` pairs from the configured columns. Rows without a score
/// are skipped.
pub fn corpus_from_table(table: &EntityTable, cfg: &ClassifierConfig) -> AppResult<Vec<(String, f64)>> {
    let text_col = table.text_column_index(&cfg.text_column).ok_or_else(|| {
        AppError::Load(format!("text column {:?} is missing", cfg.text_column))
    })?;
    let score_col = table.numeric_column_index(&cfg.score_column).ok_or_else(|| {
        AppError::Load(format!(
            "numeric score column {:?} is missing",
            cfg.score_column
        ))
    })?;

    let corpus: Vec<(String, f64)> = table
        .rows()
        .iter()
        .filter(|row| row.numeric[score_col].is_finite())
        .map(|row| (row.text[text_col].clone(), row.numeric[score_col]))
        .collect();

    let skipped = table.len() - corpus.len();
    if skipped > 0 {
        log::warn!("skipping {skipped} rows without a {:?} score", cfg.score_column);
    }

    Ok(corpus)
}

/// Fits count vectorizer, tf-idf weights and Naive Bayes on a labelled
/// corpus. Scores are binarized at their median.
pub fn fit(corpus: &[(String, f64)], cfg: &ClassifierConfig) -> AppResult<(FittedPipeline, TrainingSummary)> {
    if corpus.len() < 2 {
        return Err(AppError::InsufficientData(format!(
            "need at least 2 training documents, got {}",
            corpus.len()
        )));
    }

    let scores: Vec<f64> = corpus.iter().map(|(_, score)| *score).collect();
    let threshold = median(&scores);
    let labels: Vec<bool> = scores.iter().map(|score| *score >= threshold).collect();

    let analyzer = Analyzer::StemmedEnglish;
    let documents: Vec<Vec<String>> = corpus
        .par_iter()
        .map(|(text, _)| analyzer.analyze(text))
        .collect();

    let (vectorizer, counts) = CountVectorizer::fit_transform(analyzer, cfg.min_df, &documents);
    if vectorizer.is_empty() {
        return Err(AppError::InsufficientData(format!(
            "no term appears in at least {} documents",
            cfg.min_df
        )));
    }

    let tfidf = TfidfTransformer::fit(&counts, vectorizer.len());
    let weighted: Vec<_> = counts.iter().map(|row| tfidf.transform(row)).collect();
    let classifier = MultinomialNb::fit(&weighted, &labels, vectorizer.len(), cfg.alpha)?;

    let summary = TrainingSummary {
        documents: corpus.len(),
        vocabulary_size: vectorizer.len(),
        threshold,
        persuasive: labels.iter().filter(|l| **l).count(),
    };
    log::info!(
        "fitted classifier on {} documents, {} terms, threshold {:.4}",
        summary.documents,
        summary.vocabulary_size,
        summary.threshold
    );

    Ok((
        FittedPipeline {
            vectorizer,
            tfidf,
            classifier,
        },
        summary,
    ))
}

impl FittedPipeline {
    /// Stages that disagree on the feature count cannot have been fitted
    /// together.
    pub fn check_consistent(&self) -> AppResult<()> {
        let n = self.vectorizer.len();
        if self.tfidf.idf.len() != n || self.classifier.n_features() != n {
            return Err(AppError::ModelUnavailable(format!(
                "stage sizes disagree: vocabulary {n}, idf {}, classifier {}",
                self.tfidf.idf.len(),
                self.classifier.n_features()
            )));
        }
        Ok(())
    }

    /// Classifies `text`. Terms outside the vocabulary are ignored, so empty
    /// or unknown input yields the class priors.
    pub fn predict(&self, text: &str) -> Prediction {
        let counts = self.vectorizer.transform(text);
        let weighted = self.tfidf.transform(&counts);
        let probability = self.classifier.positive_probability(&weighted);

        let label = if probability > 0.5 {
            Label::Persuasive
        } else {
            Label::NotPersuasive
        };

        Prediction { label, probability }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<(String, f64)> {
        vec![
            ("freedom and courage can change the world".to_string(), 0.9),
            ("courage will inspire people to change".to_string(), 0.8),
            ("boring data in a table of numbers".to_string(), 0.1),
            ("numbers in a spreadsheet table are boring".to_string(), 0.2),
        ]
    }

    #[test]
    fn median_of_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn fits_and_separates_classes() {
        let (pipeline, summary) = fit(&corpus(), &ClassifierConfig::default()).unwrap();
        pipeline.check_consistent().unwrap();

        assert_eq!(summary.documents, 4);
        assert_eq!(summary.persuasive, 2);
        assert!((summary.threshold - 0.5).abs() < 1e-12);
        // courage, change, boring, numbers, table survive min_df = 2
        assert_eq!(summary.vocabulary_size, 5);

        let good = pipeline.predict("Courage and change");
        assert_eq!(good.label, Label::Persuasive);
        assert!(good.probability > 0.5);

        let bad = pipeline.predict("boring numbers");
        assert_eq!(bad.label, Label::NotPersuasive);
        assert!(bad.probability < 0.5);
    }

    #[test]
    fn unknown_or_empty_text_uses_priors() {
        let (pipeline, _) = fit(&corpus(), &ClassifierConfig::default()).unwrap();
        let empty = pipeline.predict("");
        let unknown = pipeline.predict("zebra quantum");
        assert!((empty.probability - 0.5).abs() < 1e-12);
        assert_eq!(empty, unknown);
        assert_eq!(empty.label, Label::NotPersuasive);
    }

    #[test]
    fn predict_is_deterministic() {
        let (pipeline, _) = fit(&corpus(), &ClassifierConfig::default()).unwrap();
        let text = "courage in a table";
        assert_eq!(pipeline.predict(text), pipeline.predict(text));

        let (again, _) = fit(&corpus(), &ClassifierConfig::default()).unwrap();
        assert_eq!(pipeline, again);
    }

    #[test]
    fn too_small_corpus_is_insufficient() {
        let err = fit(&corpus()[..1], &ClassifierConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));

        let identical = vec![("same words".to_string(), 0.5), ("same words".to_string(), 0.5)];
        let err = fit(&identical, &ClassifierConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn summary_line() {
        let prediction = Prediction {
            label: Label::Persuasive,
            probability: 0.731234,
        };
        assert_eq!(
            prediction.summary(),
            "PERSUASIVE - 73.12% Probability of Persuasive Rating"
        );
    }

    #[test]
    fn summary_line_drops_trailing_zeros() {
        let line = |probability| {
            Prediction {
                label: Label::NotPersuasive,
                probability,
            }
            .summary()
        };
        assert_eq!(line(0.5), "NOT PERSUASIVE - 50.0% Probability of Persuasive Rating");
        assert_eq!(line(0.731), "NOT PERSUASIVE - 73.1% Probability of Persuasive Rating");
        assert_eq!(line(0.0), "NOT PERSUASIVE - 0.0% Probability of Persuasive Rating");
        assert_eq!(line(1.0), "NOT PERSUASIVE - 100.0% Probability of Persuasive Rating");
    }

    #[test]
    fn corpus_requires_columns() {
        let table = EntityTable::new(
            vec!["norm_persuasive".into()],
            vec!["transcript".into()],
            vec![
                (vec![0.4], vec!["a talk".into()]),
                (vec![f64::NAN], vec!["another".into()]),
            ],
        )
        .unwrap();
        let corpus = corpus_from_table(&table, &ClassifierConfig::default()).unwrap();
        assert_eq!(corpus, vec![("a talk".to_string(), 0.4)]);

        let cfg = ClassifierConfig {
            score_column: "missing".into(),
            ..Default::default()
        };
        assert!(matches!(
            corpus_from_table(&table, &cfg),
            Err(AppError::Load(_))
        ));
    }
}
