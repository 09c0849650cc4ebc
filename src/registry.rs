//! Trained-model persistence keyed by backend kind and city

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{ForecastError, Result};
use crate::models::arima::TrainedArima;
use crate::models::monte_carlo::TrainedMonteCarlo;
use crate::models::sequence::TrainedSequence;
use crate::models::trend::TrainedTrend;

/// One forecasting algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Autoregressive statistical model
    Arima,
    /// Recurrent sequence model
    Sequence,
    /// Probabilistic trend model
    Trend,
    /// Stochastic resampling simulation
    MonteCarlo,
}

impl BackendKind {
    /// All backends, in a stable order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Arima,
        BackendKind::Sequence,
        BackendKind::Trend,
        BackendKind::MonteCarlo,
    ];

    /// Stable lowercase wire name, also used in artifact file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Arima => "arima",
            BackendKind::Sequence => "sequence",
            BackendKind::Trend => "trend",
            BackendKind::MonteCarlo => "monte-carlo",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key: backend kind plus normalized (lowercase) city.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    kind: BackendKind,
    city: String,
}

impl ModelKey {
    /// Create a key, normalizing the city name.
    pub fn new(kind: BackendKind, city: &str) -> Self {
        Self {
            kind,
            city: city.trim().to_lowercase(),
        }
    }

    /// Get the backend kind
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Get the normalized city name
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Deterministic blob name, so `load` needs no index file.
    pub fn file_name(&self) -> String {
        format!("{}_model_{}.json", self.kind, self.city)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.city)
    }
}

/// Trained state of one backend, the persistable payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum ModelState {
    Arima(TrainedArima),
    Sequence(TrainedSequence),
    Trend(TrainedTrend),
    MonteCarlo(TrainedMonteCarlo),
}

impl ModelState {
    /// Backend that produced this state.
    pub fn kind(&self) -> BackendKind {
        match self {
            ModelState::Arima(_) => BackendKind::Arima,
            ModelState::Sequence(_) => BackendKind::Sequence,
            ModelState::Trend(_) => BackendKind::Trend,
            ModelState::MonteCarlo(_) => BackendKind::MonteCarlo,
        }
    }
}

/// Trained artifact for one `(backend, city)` key.
///
/// Immutable once produced; the registry owns the persisted copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    kind: BackendKind,
    city: String,
    trained_at: DateTime<Utc>,
    training_len: usize,
    state: ModelState,
}

impl ModelArtifact {
    /// Tag a trained state with its key and training metadata.
    pub fn new(key: &ModelKey, training_len: usize, state: ModelState) -> Result<Self> {
        if state.kind() != key.kind() {
            return Err(ForecastError::ArtifactIncompatible(format!(
                "trained state is {} but key is {}",
                state.kind(),
                key
            )));
        }

        Ok(Self {
            kind: key.kind(),
            city: key.city().to_string(),
            trained_at: Utc::now(),
            training_len,
            state,
        })
    }

    /// Get the backend kind
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Get the city
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Get the key this artifact was trained under
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.kind, &self.city)
    }

    /// Get the training timestamp
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Get the length of the training series
    pub fn training_len(&self) -> usize {
        self.training_len
    }

    /// Get the trained state
    pub fn state(&self) -> &ModelState {
        &self.state
    }
}

/// File-backed registry, one JSON blob per key.
///
/// Saves commit through a same-directory temp file and `rename`, so a
/// concurrent `load` sees either the old or the new artifact in full.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    dir: PathBuf,
}

impl ModelRegistry {
    /// Open (and create if necessary) a registry directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &ModelKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Persist an artifact, superseding any previous one for its key.
    ///
    /// The blob is written to a uniquely named temp file in the registry
    /// directory and renamed into place, so concurrent saves for the
    /// same key never share a partial write and a concurrent load sees
    /// either the old or the new artifact in full.
    pub fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let key = artifact.key();
        let path = self.path_for(&key);

        let blob = serde_json::to_vec(artifact)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&blob)?;
        tmp.persist(&path)
            .map_err(|persist_err| ForecastError::IoError(persist_err.error))?;

        info!("saved {} artifact ({} observations)", key, artifact.training_len());
        Ok(())
    }

    /// Load the artifact for a key, or `ArtifactNotFound`.
    pub fn load(&self, key: &ModelKey) -> Result<ModelArtifact> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(ForecastError::ArtifactNotFound {
                kind: key.kind(),
                city: key.city().to_string(),
            });
        }

        let blob = fs::read(&path)?;
        let artifact: ModelArtifact = serde_json::from_slice(&blob)?;

        // A renamed or copied blob carries the wrong embedded key.
        if artifact.key() != *key {
            return Err(ForecastError::ArtifactIncompatible(format!(
                "artifact at {} was trained as {}, requested {}",
                path.display(),
                artifact.key(),
                key
            )));
        }

        debug!("loaded {} artifact from {}", key, path.display());
        Ok(artifact)
    }

    /// Check whether an artifact exists without loading it.
    pub fn exists(&self, key: &ModelKey) -> bool {
        self.path_for(key).is_file()
    }
}
