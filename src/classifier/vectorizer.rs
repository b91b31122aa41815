use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{analyzer::Analyzer, SparseRow};

/// Term vocabulary with per-document term counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountVectorizer {
    pub analyzer: Analyzer,
    pub min_df: usize,
    /// Term to feature index, indices assigned in sorted term order
    pub vocabulary: BTreeMap<String, usize>,
}

fn count(terms: &[String], vocabulary: &BTreeMap<String, usize>) -> SparseRow {
    let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
    for term in terms {
        if let Some(&idx) = vocabulary.get(term) {
            *counts.entry(idx).or_insert(0.0) += 1.0;
        }
    }
    counts.into_iter().collect()
}

impl CountVectorizer {
    /// Builds the vocabulary from already analyzed documents, keeping terms
    /// found in at least `min_df` of them, and returns the count rows.
    pub fn fit_transform(
        analyzer: Analyzer,
        min_df: usize,
        documents: &[Vec<String>],
    ) -> (Self, Vec<SparseRow>) {
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in documents {
            let unique: HashSet<&str> = terms.iter().map(|t| t.as_str()).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let vocabulary: BTreeMap<String, usize> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= min_df)
            .enumerate()
            .map(|(idx, (term, _))| (term.to_string(), idx))
            .collect();

        let rows = documents
            .iter()
            .map(|terms| count(terms, &vocabulary))
            .collect();

        (
            Self {
                analyzer,
                min_df,
                vocabulary,
            },
            rows,
        )
    }

    /// Counts vocabulary terms in `text`; unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseRow {
        count(&self.analyzer.analyze(text), &self.vocabulary)
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|t| Analyzer::StemmedEnglish.analyze(t))
            .collect()
    }

    #[test]
    fn min_df_prunes_rare_terms() {
        let documents = docs(&["apple banana", "banana cherry", "banana apple apple"]);
        let (vectorizer, rows) =
            CountVectorizer::fit_transform(Analyzer::StemmedEnglish, 2, &documents);

        let terms: Vec<_> = vectorizer.vocabulary.keys().cloned().collect();
        assert_eq!(terms, vec!["appl", "banana"]);
        assert_eq!(rows[2], vec![(0, 2.0), (1, 1.0)]);
        assert_eq!(rows[1], vec![(1, 1.0)]);
    }

    #[test]
    fn transform_ignores_unknown_terms() {
        let documents = docs(&["apple banana", "banana apple"]);
        let (vectorizer, _) =
            CountVectorizer::fit_transform(Analyzer::StemmedEnglish, 1, &documents);

        assert_eq!(vectorizer.transform("banana durian banana"), vec![(1, 2.0)]);
        assert!(vectorizer.transform("durian").is_empty());
        assert!(vectorizer.transform("").is_empty());
    }
}
