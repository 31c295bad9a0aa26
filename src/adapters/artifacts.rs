//! Model artifact adapter: persists trained bundles on disk.
//!
//! Layout of the model directory:
//! - `model_bundle.json`: the serialized [`ModelBundle`]
//! - `manifest.json`: SHA-256 digest of every bound file
//!
//! Both files are written to a temporary name and renamed into place, so a
//! reader never sees a half-written bundle.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::ModelBundle;

const BUNDLE_FILE: &str = "model_bundle.json";
const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Missing artifact file: {0}")]
    MissingFile(String),

    #[error("Unsupported manifest version: {0}")]
    UnsupportedVersion(u32),

    #[error("Model bundle was trained on a different feature layout")]
    IncompatibleLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    created_at: DateTime<Utc>,
    files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

/// Filesystem store for model bundles.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
        move |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, bytes).map_err(Self::io_err(&tmp))?;
        fs::rename(&tmp, &target).map_err(Self::io_err(&target))?;
        Ok(())
    }

    /// Persist a bundle, replacing any previous one.
    ///
    /// # Returns
    /// Path of the written bundle file.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or a file cannot be written.
    pub fn save(&self, bundle: &ModelBundle) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;

        let bundle_bytes = serde_json::to_vec_pretty(bundle)?;
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            files: BTreeMap::from([(BUNDLE_FILE.to_string(), sha256_hex(&bundle_bytes))]),
        };

        // Bundle first: a crash in between leaves a digest mismatch, never a silent mix.
        self.write_atomic(BUNDLE_FILE, &bundle_bytes)?;
        self.write_atomic(MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?)?;

        let path = self.dir.join(BUNDLE_FILE);
        tracing::info!("Saved model bundle to {}", path.display());
        Ok(path)
    }

    /// Load and verify the stored bundle.
    ///
    /// # Returns
    /// `None` if no bundle has been saved yet.
    ///
    /// # Errors
    /// Returns error if the manifest is missing or unsupported, the digest
    /// does not match, or the bundle cannot be parsed.
    pub fn load(&self) -> Result<Option<ModelBundle>, ArtifactError> {
        let bundle_path = self.dir.join(BUNDLE_FILE);
        if !bundle_path.exists() {
            tracing::info!("No model bundle in {}", self.dir.display());
            return Ok(None);
        }

        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ArtifactError::MissingFile(MANIFEST_FILE.to_string()));
        }

        let manifest: Manifest = serde_json::from_slice(
            &fs::read(&manifest_path).map_err(Self::io_err(&manifest_path))?,
        )?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::UnsupportedVersion(manifest.version));
        }

        let expected = manifest
            .files
            .get(BUNDLE_FILE)
            .ok_or_else(|| ArtifactError::MissingFile(format!("{MANIFEST_FILE}:{BUNDLE_FILE}")))?;

        let bytes = fs::read(&bundle_path).map_err(Self::io_err(&bundle_path))?;
        let actual = sha256_hex(&bytes);
        if &actual != expected {
            return Err(ArtifactError::IntegrityMismatch {
                file: BUNDLE_FILE.to_string(),
                expected: expected.clone(),
                actual,
            });
        }

        let bundle: ModelBundle = serde_json::from_slice(&bytes)?;
        if !bundle.matches_feature_layout() {
            return Err(ArtifactError::IncompatibleLayout);
        }

        tracing::info!(
            "Loaded model bundle trained at {} (manifest {})",
            bundle.trained_at,
            manifest.created_at
        );
        Ok(Some(bundle))
    }
}
