use std::sync::Arc;

use crate::{
    bookmarks::{Bookmark, BookmarkLog, MemoryBookmarkLog},
    classifier::{self, Prediction},
    config::Config,
    features::{CsvFeatureStore, FeatureStore},
    models::{ArtifactStore, VersionInfo},
    similarity::{self, Recommendation},
};

use super::errors::AppResult;

/// Everything a front end needs: speaker recommendations, persuasiveness
/// predictions and the bookmark log.
///
/// The feature table and the classifier are read from disk on every call;
/// only the bookmark log is held in memory.
pub struct App {
    config: Config,
    features: Box<dyn FeatureStore>,
    models: ArtifactStore,
    bookmarks: Arc<dyn BookmarkLog>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let bookmarks = Arc::new(MemoryBookmarkLog::new(
            config.bookmarks.user.clone(),
            config.bookmarks.url_policy,
        ));
        Self::with_bookmarks(config, bookmarks)
    }

    pub fn with_bookmarks(config: Config, bookmarks: Arc<dyn BookmarkLog>) -> Self {
        let required = vec![
            config.columns.name.clone(),
            config.columns.description.clone(),
            config.columns.url.clone(),
        ];
        let features = Box::new(CsvFeatureStore::new(config.dataset_file(), required));
        let models = ArtifactStore::new(config.models_path());

        Self {
            config,
            features,
            models,
            bookmarks,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn find_similar(&self, name: &str) -> AppResult<Recommendation> {
        let table = self.features.load()?;
        similarity::find_similar(&table, name, &self.config.columns, &self.config.similarity)
    }

    pub fn rank_similar(&self, name: &str, k: usize) -> AppResult<Vec<Recommendation>> {
        let table = self.features.load()?;
        similarity::rank_similar(
            &table,
            name,
            k,
            &self.config.columns,
            &self.config.similarity,
        )
    }

    pub fn predict(&self, text: &str) -> AppResult<Prediction> {
        let pipeline = self.models.load_current()?;
        Ok(pipeline.predict(text))
    }

    /// Fits a new classifier on the feature table and publishes it as the
    /// current version.
    pub fn fit_and_publish(&self) -> AppResult<String> {
        let _span = tracing::info_span!("fit", dataset = %self.config.dataset_file().display()).entered();
        let table = self.features.load()?;
        let corpus = classifier::corpus_from_table(&table, &self.config.classifier)?;
        let (pipeline, summary) = classifier::fit(&corpus, &self.config.classifier)?;
        self.models.publish(&pipeline, &summary)
    }

    pub fn model_versions(&self) -> AppResult<Vec<VersionInfo>> {
        self.models.list()
    }

    pub fn activate_model(&self, version: &str) -> AppResult<()> {
        self.models.activate(version)
    }

    pub fn add_bookmark(&self, url: &str) -> AppResult<Bookmark> {
        self.bookmarks.add(url)
    }

    pub fn recent_bookmarks(&self, n: usize) -> Vec<Bookmark> {
        self.bookmarks.recent(n)
    }
}
