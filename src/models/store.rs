//! Versioned store for the fitted classifier stages.
//!
//! Layout under the store root:
//!
//! ```text
//! CURRENT                          active version id
//! versions/<id>/vectorizer.json
//! versions/<id>/tfidf.json
//! versions/<id>/classifier.json
//! versions/<id>/manifest.json      format version, summary, sha256 per stage
//! ```
//!
//! A version directory is complete before `CURRENT` is repointed at it, and
//! every file is written with temp-file + rename, so readers see either the
//! previous triple or the new one.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    app::errors::{AppError, AppResult},
    classifier::{FittedPipeline, TrainingSummary},
    storage::{BackendLocal, StorageManager},
};

/// Bumped whenever the serialized form of a stage changes.
pub const FORMAT_VERSION: u32 = 1;

const CURRENT_FILE: &str = "CURRENT";
const VERSIONS_DIR: &str = "versions";
const MANIFEST_FILE: &str = "manifest.json";
const VECTORIZER_FILE: &str = "vectorizer.json";
const TFIDF_FILE: &str = "tfidf.json";
const CLASSIFIER_FILE: &str = "classifier.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub summary: TrainingSummary,
    /// Stage file name to lowercase hex sha256
    pub checksums: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub documents: usize,
    pub vocabulary_size: usize,
    pub active: bool,
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn unavailable(reason: impl Into<String>) -> AppError {
    AppError::ModelUnavailable(reason.into())
}

fn version_dir(version: &str) -> String {
    format!("{VERSIONS_DIR}/{version}")
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn storage(&self) -> std::io::Result<BackendLocal> {
        BackendLocal::new(&self.root)
    }

    /// Writes the triple as a new version and makes it current.
    pub fn publish(&self, pipeline: &FittedPipeline, summary: &TrainingSummary) -> AppResult<String> {
        let storage = self.storage()?;
        let version = rusty_ulid::Ulid::generate().to_string();
        let dir = version_dir(&version);

        let stages = [
            (VECTORIZER_FILE, serde_json::to_vec(&pipeline.vectorizer)),
            (TFIDF_FILE, serde_json::to_vec(&pipeline.tfidf)),
            (CLASSIFIER_FILE, serde_json::to_vec(&pipeline.classifier)),
        ];

        let mut checksums = BTreeMap::new();
        for (name, data) in stages {
            let data = data.map_err(anyhow::Error::from)?;
            checksums.insert(name.to_string(), sha256_hex(&data));
            storage.write(&format!("{dir}/{name}"), &data)?;
        }

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            version: version.clone(),
            created_at: Utc::now(),
            summary: summary.clone(),
            checksums,
        };
        let manifest = serde_json::to_vec_pretty(&manifest).map_err(anyhow::Error::from)?;
        storage.write(&format!("{dir}/{MANIFEST_FILE}"), &manifest)?;

        storage.write(CURRENT_FILE, version.as_bytes())?;
        log::info!("published classifier version {version}");

        Ok(version)
    }

    pub fn current_version(&self) -> AppResult<Option<String>> {
        let storage = self.storage()?;
        if !storage.exists(CURRENT_FILE) {
            return Ok(None);
        }
        let raw = storage.read(CURRENT_FILE)?;
        let version = String::from_utf8_lossy(&raw).trim().to_string();
        Ok(if version.is_empty() { None } else { Some(version) })
    }

    /// Loads the active triple. Every failure is reported as
    /// [`AppError::ModelUnavailable`].
    pub fn load_current(&self) -> AppResult<FittedPipeline> {
        let version = self
            .current_version()
            .map_err(|err| unavailable(format!("couldnt read version pointer: {err}")))?
            .ok_or_else(|| unavailable("no model has been published yet"))?;
        self.load_version(&version)
    }

    pub fn load_version(&self, version: &str) -> AppResult<FittedPipeline> {
        if version.parse::<rusty_ulid::Ulid>().is_err() {
            return Err(unavailable(format!("invalid version id {version:?}")));
        }

        let storage = self
            .storage()
            .map_err(|err| unavailable(format!("couldnt open model store: {err}")))?;
        let manifest = read_manifest(&storage, version)?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(unavailable(format!(
                "version {version} has format {}, expected {FORMAT_VERSION}",
                manifest.format_version
            )));
        }

        let pipeline = FittedPipeline {
            vectorizer: read_stage(&storage, &manifest, VECTORIZER_FILE)?,
            tfidf: read_stage(&storage, &manifest, TFIDF_FILE)?,
            classifier: read_stage(&storage, &manifest, CLASSIFIER_FILE)?,
        };
        pipeline.check_consistent()?;

        log::debug!("loaded classifier version {version}");
        Ok(pipeline)
    }

    /// All versions with a readable manifest, oldest first.
    pub fn list(&self) -> AppResult<Vec<VersionInfo>> {
        let storage = self.storage()?;
        let current = self.current_version()?;

        let mut infos = vec![];
        for version in storage.list(VERSIONS_DIR) {
            match read_manifest(&storage, &version) {
                Ok(manifest) => infos.push(VersionInfo {
                    active: current.as_deref() == Some(version.as_str()),
                    version,
                    created_at: manifest.created_at,
                    documents: manifest.summary.documents,
                    vocabulary_size: manifest.summary.vocabulary_size,
                }),
                Err(err) => log::warn!("skipping model version {version}: {err}"),
            }
        }
        Ok(infos)
    }

    /// Repoints `CURRENT` at an existing version after verifying it loads.
    pub fn activate(&self, version: &str) -> AppResult<()> {
        let storage = self.storage()?;
        if version.parse::<rusty_ulid::Ulid>().is_err()
            || !storage.exists(&format!("{}/{MANIFEST_FILE}", version_dir(version)))
        {
            return Err(AppError::NotFound(version.to_string()));
        }

        self.load_version(version)?;
        storage.write(CURRENT_FILE, version.as_bytes())?;
        log::info!("activated classifier version {version}");
        Ok(())
    }
}

fn read_manifest(storage: &BackendLocal, version: &str) -> AppResult<Manifest> {
    let raw = storage
        .read(&format!("{}/{MANIFEST_FILE}", version_dir(version)))
        .map_err(|err| unavailable(format!("couldnt read manifest of {version}: {err}")))?;
    let manifest: Manifest = serde_json::from_slice(&raw)
        .map_err(|err| unavailable(format!("manifest of {version} is malformed: {err}")))?;

    if manifest.version != version {
        return Err(unavailable(format!(
            "manifest in {version} belongs to version {}",
            manifest.version
        )));
    }
    Ok(manifest)
}

fn read_stage<T: DeserializeOwned>(
    storage: &BackendLocal,
    manifest: &Manifest,
    name: &str,
) -> AppResult<T> {
    let version = &manifest.version;
    let raw = storage
        .read(&format!("{}/{name}", version_dir(version)))
        .map_err(|err| unavailable(format!("couldnt read {name} of {version}: {err}")))?;

    let expected = manifest
        .checksums
        .get(name)
        .ok_or_else(|| unavailable(format!("manifest of {version} has no checksum for {name}")))?;
    if &sha256_hex(&raw) != expected {
        return Err(unavailable(format!("{name} of {version} is corrupt")));
    }

    serde_json::from_slice(&raw)
        .map_err(|err| unavailable(format!("{name} of {version} is malformed: {err}")))
}
