use serde::Serialize;

use super::normalize::{euclidean, zscore};
use crate::{
    app::errors::{AppError, AppResult},
    config::{ColumnsConfig, SimilarityConfig},
    features::EntityTable,
};

/// A speaker recommended for a query, with the fields a page needs to show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Row of the feature table the match came from
    pub index: usize,
    pub display_name: String,
    pub description: String,
    pub url: String,
    /// Euclidean distance to the query in normalized feature space
    pub distance: f64,
}

impl Recommendation {
    /// The url with a `www.` host rewritten to `embed.`, which is where the
    /// talk pages serve their embeddable player. Other urls pass through.
    pub fn embed_url(&self) -> String {
        let Ok(mut parsed) = url::Url::parse(&self.url) else {
            return self.url.clone();
        };

        let embed_host = parsed
            .host_str()
            .and_then(|host| host.strip_prefix("www."))
            .map(|rest| format!("embed.{rest}"));

        match embed_host {
            Some(host) if parsed.set_host(Some(&host)).is_ok() => parsed.to_string(),
            _ => self.url.clone(),
        }
    }
}

fn text_column(table: &EntityTable, name: &str) -> AppResult<usize> {
    table
        .text_column_index(name)
        .ok_or_else(|| AppError::Load(format!("column {name:?} is missing")))
}

/// Ranks every other entity by distance to `query_name` and returns the
/// closest `k`.
///
/// The query is the first row whose name equals `query_name` exactly. It is
/// excluded by row index; the rest are ordered by `(distance, row index)`,
/// so equal distances resolve to the earliest row.
pub fn rank_similar(
    table: &EntityTable,
    query_name: &str,
    k: usize,
    columns: &ColumnsConfig,
    cfg: &SimilarityConfig,
) -> AppResult<Vec<Recommendation>> {
    if k == 0 {
        return Err(AppError::Validation(
            "number of recommendations must be at least 1".to_string(),
        ));
    }

    let name_col = text_column(table, &columns.name)?;
    let description_col = text_column(table, &columns.description)?;
    let url_col = text_column(table, &columns.url)?;

    let query = table
        .rows()
        .iter()
        .position(|row| row.text[name_col] == query_name)
        .ok_or_else(|| AppError::NotFound(query_name.to_string()))?;

    if table.len() < 2 {
        return Err(AppError::InsufficientData(format!(
            "need at least 2 speakers to compare, table has {}",
            table.len()
        )));
    }

    let features = zscore(table, &cfg.excluded_columns, cfg.missing);
    if features.columns.is_empty() {
        return Err(AppError::InsufficientData(
            "no numeric column with variance is left to compare on".to_string(),
        ));
    }
    log::debug!(
        "comparing {query_name:?} on {} features over {} speakers",
        features.columns.len(),
        table.len()
    );

    let target = &features.rows[query];
    let mut distances: Vec<(usize, f64)> = features
        .rows
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != query)
        .map(|(idx, row)| (idx, euclidean(target, row)))
        .collect();

    distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let ties = distances.iter().filter(|(_, d)| *d == 0.0).count();
    if ties > 0 {
        log::warn!("{ties} speakers have the same features as {query_name:?}, picking by row order");
    }

    Ok(distances
        .into_iter()
        .take(k)
        .map(|(idx, distance)| {
            let row = &table.rows()[idx];
            Recommendation {
                index: row.index,
                display_name: row.text[name_col].clone(),
                description: row.text[description_col].clone(),
                url: row.text[url_col].clone(),
                distance,
            }
        })
        .collect())
}

/// The single nearest other entity to `query_name`.
pub fn find_similar(
    table: &EntityTable,
    query_name: &str,
    columns: &ColumnsConfig,
    cfg: &SimilarityConfig,
) -> AppResult<Recommendation> {
    rank_similar(table, query_name, 1, columns, cfg)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::InsufficientData("no other speaker to recommend".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingPolicy;

    fn speakers(rows: &[(&str, f64, f64)]) -> EntityTable {
        EntityTable::new(
            vec!["f1".into(), "f2".into()],
            vec!["main_speaker".into(), "description".into(), "url".into()],
            rows.iter()
                .map(|(name, f1, f2)| {
                    (
                        vec![*f1, *f2],
                        vec![
                            name.to_string(),
                            format!("about {name}"),
                            format!("https://www.ted.com/talks/{name}"),
                        ],
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn cfg() -> SimilarityConfig {
        SimilarityConfig {
            excluded_columns: vec![],
            missing: MissingPolicy::ImputeMean,
        }
    }

    #[test]
    fn picks_the_closer_speaker() {
        let table = speakers(&[("A", 0.0, 0.0), ("B", 10.0, 10.0), ("C", 1.0, 1.0)]);
        let rec = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap();
        assert_eq!(rec.display_name, "C");
        assert_eq!(rec.description, "about C");
        assert_eq!(rec.url, "https://www.ted.com/talks/C");
        assert_eq!(rec.index, 2);
    }

    #[test]
    fn never_returns_the_query() {
        let table = speakers(&[
            ("A", 0.0, 3.0),
            ("B", 5.0, 1.0),
            ("C", 2.0, 2.0),
            ("D", 7.0, 0.5),
        ]);
        for name in ["A", "B", "C", "D"] {
            let rec = find_similar(&table, name, &ColumnsConfig::default(), &cfg()).unwrap();
            assert_ne!(rec.display_name, name);
        }
    }

    #[test]
    fn ties_resolve_to_the_lowest_row() {
        // B and C are both exactly 1.0 away from A
        let table = speakers(&[("A", 0.0, 0.0), ("B", 1.0, 0.0), ("C", -1.0, 0.0), ("D", 0.0, 9.0)]);
        for _ in 0..5 {
            let rec = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap();
            assert_eq!(rec.display_name, "B");
        }
    }

    #[test]
    fn duplicate_feature_vectors_are_picked_by_row_order() {
        let table = speakers(&[("A", 1.0, 1.0), ("B", 5.0, 5.0), ("C", 1.0, 1.0), ("D", 1.0, 1.0)]);
        let rec = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap();
        assert_eq!(rec.display_name, "C");
        assert_eq!(rec.distance, 0.0);
    }

    #[test]
    fn first_matching_row_is_the_query() {
        let table = speakers(&[("A", 0.0, 0.0), ("B", 9.0, 9.0), ("A", 8.0, 8.0)]);
        let rec = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap();
        // the second "A" is a different row and is closest to B
        assert_eq!(rec.index, 2);
        let rec = find_similar(&table, "B", &ColumnsConfig::default(), &cfg()).unwrap();
        assert_eq!(rec.index, 2);
    }

    #[test]
    fn name_match_is_case_sensitive() {
        let table = speakers(&[("Al Gore", 0.0, 0.0), ("B", 1.0, 1.0)]);
        let err = find_similar(&table, "al gore", &ColumnsConfig::default(), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn single_entity_is_insufficient() {
        let table = speakers(&[("A", 0.0, 0.0)]);
        let err = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn all_columns_degenerate_is_insufficient() {
        let table = speakers(&[("A", 1.0, 1.0), ("B", 1.0, 1.0), ("C", 1.0, 1.0)]);
        let err = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn excluded_columns_do_not_count() {
        // on f1 alone A is closest to B, on f2 alone to C
        let table = speakers(&[("A", 0.0, 0.0), ("B", 1.0, 50.0), ("C", 40.0, 2.0)]);
        let mut config = cfg();
        config.excluded_columns = vec!["f1".to_string()];
        let rec = find_similar(&table, "A", &ColumnsConfig::default(), &config).unwrap();
        assert_eq!(rec.display_name, "C");

        config.excluded_columns = vec!["f2".to_string()];
        let rec = find_similar(&table, "A", &ColumnsConfig::default(), &config).unwrap();
        assert_eq!(rec.display_name, "B");
    }

    #[test]
    fn rank_returns_k_in_order() {
        let table = speakers(&[("A", 0.0, 0.0), ("B", 10.0, 10.0), ("C", 1.0, 1.0), ("D", 3.0, 3.0)]);
        let ranked = rank_similar(&table, "A", 10, &ColumnsConfig::default(), &cfg()).unwrap();
        let names: Vec<_> = ranked.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "B"]);
        assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));

        let err = rank_similar(&table, "A", 0, &ColumnsConfig::default(), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_required_column_is_load_error() {
        let table = EntityTable::new(vec!["f1".into()], vec!["main_speaker".into()], vec![]).unwrap();
        let err = find_similar(&table, "A", &ColumnsConfig::default(), &cfg()).unwrap_err();
        assert!(matches!(err, AppError::Load(_)));
    }

    #[test]
    fn embed_url_rewrites_www_host() {
        let rec = Recommendation {
            index: 0,
            display_name: "A".into(),
            description: String::new(),
            url: "https://www.ted.com/talks/ken_robinson_says_schools_kill_creativity".into(),
            distance: 0.0,
        };
        assert_eq!(
            rec.embed_url(),
            "https://embed.ted.com/talks/ken_robinson_says_schools_kill_creativity"
        );

        let other = Recommendation {
            url: "https://example.com/x".into(),
            ..rec.clone()
        };
        assert_eq!(other.embed_url(), "https://example.com/x");

        let junk = Recommendation {
            url: "not a url".into(),
            ..rec
        };
        assert_eq!(junk.embed_url(), "not a url");
    }
}
