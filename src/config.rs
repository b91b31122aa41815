use crate::{
    app::errors::{AppError, AppResult},
    storage::{self, StorageManager},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_DATASET_PATH: &str = "processed/all_with_liwc_segmented.csv";
const DEFAULT_MODELS_DIR: &str = "models";
const DEFAULT_MIN_DF: usize = 2;
const DEFAULT_ALPHA: f64 = 1.0;
const DEFAULT_BOOKMARK_USER: &str = "TEDster";
const DEFAULT_RECENT_COUNT: usize = 5;

/// Columns that say nothing about a speaker's linguistic style: engagement
/// metrics, dates, punctuation counters, moral foundations scores and the
/// per-segment sentiment breakdowns.
const DEFAULT_EXCLUDED_COLUMNS: &[&str] = &[
    "conversation", "music", "index", "languages", "comments", "duration", "views",
    "persuasive", "unconvincing", "inspiring", "film_date", "published_date",
    "published_year", "AllPunc", "Period", "Comma", "Colon", "SemiC", "QMark", "Exclam",
    "Dash", "Quote", "Apostro", "Parenth", "OtherP", "affect_1h", "posemo_1h",
    "negemo_1h", "anx_1h", "anger_1h", "sad_1h", "affect_2h", "posemo_2h", "negemo_2h",
    "anx_2h", "anger_2h", "sad_2h", "affect_1q", "posemo_1q", "negemo_1q", "anx_1q",
    "anger_1q", "sad_1q", "affect_2q", "posemo_2q", "negemo_2q", "anx_2q", "anger_2q",
    "sad_2q", "affect_3q", "posemo_3q", "negemo_3q", "anx_3q", "anger_3q", "sad_3q",
    "affect_4q", "posemo_4q", "negemo_4q", "anx_4q", "anger_4q", "sad_4q",
    "posemo_change_h", "negemo_change_h", "affect_change_h", "posemo_change_q",
    "negemo_change_q", "affect_change_q", "HarmVirtue", "HarmVice", "AuthorityVirtue",
    "AuthorityVice", "FairnessVirtue", "FairnessVice", "IngroupVirtue", "IngroupVice",
    "PurityVirtue", "PurityVice", "Moral", "MoralityGeneral",
];

/// Names of the text columns a recommendation is built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_name_column")]
    pub name: String,
    #[serde(default = "default_description_column")]
    pub description: String,
    #[serde(default = "default_url_column")]
    pub url: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            name: default_name_column(),
            description: default_description_column(),
            url: default_url_column(),
        }
    }
}

fn default_name_column() -> String {
    "main_speaker".to_string()
}

fn default_description_column() -> String {
    "description".to_string()
}

fn default_url_column() -> String {
    "url".to_string()
}

/// What to do with numeric cells that are empty or NaN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Replace the cell with the column mean (z-score 0).
    #[default]
    ImputeMean,
    /// Leave out every column that has a missing cell.
    DropColumn,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_excluded_columns")]
    pub excluded_columns: Vec<String>,

    #[serde(default)]
    pub missing: MissingPolicy,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            excluded_columns: default_excluded_columns(),
            missing: MissingPolicy::default(),
        }
    }
}

fn default_excluded_columns() -> Vec<String> {
    DEFAULT_EXCLUDED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Column holding the training text
    #[serde(default = "default_text_column")]
    pub text_column: String,

    /// Column holding the continuous persuasiveness score
    #[serde(default = "default_score_column")]
    pub score_column: String,

    /// Minimum number of documents a stemmed term must appear in
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Additive (Laplace) smoothing for the Naive Bayes likelihoods
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            text_column: default_text_column(),
            score_column: default_score_column(),
            min_df: DEFAULT_MIN_DF,
            alpha: DEFAULT_ALPHA,
        }
    }
}

fn default_text_column() -> String {
    "transcript".to_string()
}

fn default_score_column() -> String {
    "norm_persuasive".to_string()
}

fn default_min_df() -> usize {
    DEFAULT_MIN_DF
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

/// How submitted bookmark urls are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPolicy {
    /// Store whatever was submitted; only blank input is refused.
    #[default]
    Verbatim,
    /// Require an absolute http(s) url.
    Validate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookmarksConfig {
    #[serde(default = "default_bookmark_user")]
    pub user: String,

    #[serde(default)]
    pub url_policy: UrlPolicy,

    /// How many bookmarks to show after adding one
    #[serde(default = "default_recent_count")]
    pub recent_count: usize,
}

impl Default for BookmarksConfig {
    fn default() -> Self {
        Self {
            user: default_bookmark_user(),
            url_policy: UrlPolicy::default(),
            recent_count: DEFAULT_RECENT_COUNT,
        }
    }
}

fn default_bookmark_user() -> String {
    DEFAULT_BOOKMARK_USER.to_string()
}

fn default_recent_count() -> usize {
    DEFAULT_RECENT_COUNT
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Feature table, relative to the base path unless absolute
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Classifier artifact store, relative to the base path unless absolute
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub bookmarks: BookmarksConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            models_dir: default_models_dir(),
            columns: ColumnsConfig::default(),
            similarity: SimilarityConfig::default(),
            classifier: ClassifierConfig::default(),
            bookmarks: BookmarksConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_PATH)
}

fn default_models_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MODELS_DIR)
}

impl Config {
    fn validate(&self) -> AppResult<()> {
        let columns = [
            ("columns.name", &self.columns.name),
            ("columns.description", &self.columns.description),
            ("columns.url", &self.columns.url),
            ("classifier.text_column", &self.classifier.text_column),
            ("classifier.score_column", &self.classifier.score_column),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{key} must not be empty")));
            }
        }

        if self.classifier.min_df == 0 {
            return Err(AppError::Config(
                "classifier.min_df must be at least 1".to_string(),
            ));
        }

        if !(self.classifier.alpha > 0.0 && self.classifier.alpha.is_finite()) {
            return Err(AppError::Config(format!(
                "classifier.alpha must be a positive number, got {}",
                self.classifier.alpha
            )));
        }

        if self.bookmarks.recent_count == 0 {
            return Err(AppError::Config(
                "bookmarks.recent_count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Loads `config.yaml` from `base_path`, creating it with defaults when
    /// absent and re-saving it when the stored form is outdated.
    pub fn load_with(base_path: impl AsRef<Path>) -> AppResult<Self> {
        let store = storage::BackendLocal::new(base_path.as_ref())?;

        if !store.exists(CONFIG_FILE) {
            log::info!(
                "creating default config at {}",
                base_path.as_ref().join(CONFIG_FILE).display()
            );
            let default_str = serde_yml::to_string(&Self::default())
                .map_err(|err| AppError::Config(err.to_string()))?;
            store.write(CONFIG_FILE, default_str.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)
            .map_err(|_| AppError::Config("config file is not valid utf8".to_string()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .map_err(|err| AppError::Config(format!("config is malformed: {err}")))?;

        config.base_path = base_path.as_ref().to_path_buf();
        config.validate()?;

        let current = serde_yml::to_string(&config)
            .map_err(|err| AppError::Config(err.to_string()))?;
        if config_str != current {
            log::debug!("upgrading stored config");
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;
        let config_str =
            serde_yml::to_string(&self).map_err(|err| AppError::Config(err.to_string()))?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    /// A config rooted at `base_path` that is never read from disk.
    #[cfg(test)]
    pub fn in_memory(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    pub fn dataset_file(&self) -> PathBuf {
        self.resolve(&self.dataset_path)
    }

    pub fn models_path(&self) -> PathBuf {
        self.resolve(&self.models_dir)
    }
}
