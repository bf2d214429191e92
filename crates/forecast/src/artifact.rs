//! Model artifact persistence and the process-wide model handle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Evaluation, FEATURE_COLUMNS, SalesModel};

/// A trained model together with the feature-column order it was fitted
/// with. The two are serialized as one JSON document and loaded as one
/// immutable value; a model is never paired with someone else's column
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_columns: Vec<String>,
    pub model: SalesModel,
    pub evaluation: Evaluation,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Packages a freshly trained model with the canonical column order.
    pub fn new(model: SalesModel, evaluation: Evaluation) -> Self {
        Self {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            model,
            evaluation,
            trained_at: Utc::now(),
        }
    }
}

/// Process-wide holder of the current model artifact.
///
/// Readers clone an `Arc` snapshot and keep predicting with it even while
/// training installs a replacement — stale but never torn. `refresh`
/// re-reads the artifact file explicitly; nothing reloads behind the
/// caller's back.
#[derive(Debug)]
pub struct ForecastModelHandle {
    path: PathBuf,
    slot: RwLock<Option<Arc<ModelArtifact>>>,
}

impl ForecastModelHandle {
    /// Creates an empty handle persisting to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: RwLock::new(None),
        }
    }

    /// The artifact file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current artifact snapshot, if one is loaded.
    pub fn current(&self) -> Option<Arc<ModelArtifact>> {
        self.slot.read().unwrap().clone()
    }

    /// Re-reads the artifact file. A missing file empties the slot and
    /// returns None.
    pub fn refresh(&self) -> Result<Option<Arc<ModelArtifact>>> {
        let loaded = match std::fs::read(&self.path) {
            Ok(bytes) => Some(Arc::new(serde_json::from_slice::<ModelArtifact>(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        *self.slot.write().unwrap() = loaded.clone();
        Ok(loaded)
    }

    /// Persists a new artifact and swaps it in for readers. The file is
    /// written to a temporary sibling and renamed so a concurrent refresh
    /// never sees a half-written document.
    pub fn install(&self, artifact: ModelArtifact) -> Result<Arc<ModelArtifact>> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&artifact)?)?;
        std::fs::rename(&tmp, &self.path)?;

        let artifact = Arc::new(artifact);
        *self.slot.write().unwrap() = Some(artifact.clone());
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_artifact_path() -> PathBuf {
        std::env::temp_dir().join(format!("sales_model_{}.json", uuid::Uuid::new_v4()))
    }

    fn sample_artifact() -> ModelArtifact {
        ModelArtifact::new(
            SalesModel {
                intercept: 12.5,
                coefficients: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            },
            Evaluation {
                r2: 0.97,
                rmse: 42.0,
                train_rows: 8,
                test_rows: 2,
            },
        )
    }

    #[test]
    fn empty_handle_has_no_model() {
        let handle = ForecastModelHandle::new(temp_artifact_path());
        assert!(handle.current().is_none());
        assert!(handle.refresh().unwrap().is_none());
    }

    #[test]
    fn install_persists_and_swaps() {
        let path = temp_artifact_path();
        let handle = ForecastModelHandle::new(&path);
        let artifact = sample_artifact();

        handle.install(artifact.clone()).unwrap();
        assert_eq!(handle.current().unwrap().model, artifact.model);

        // A second handle over the same path picks the artifact up on
        // refresh, column order intact.
        let other = ForecastModelHandle::new(&path);
        let loaded = other.refresh().unwrap().unwrap();
        assert_eq!(loaded.feature_columns, artifact.feature_columns);
        assert_eq!(loaded.model, artifact.model);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn refresh_after_delete_empties_the_slot() {
        let path = temp_artifact_path();
        let handle = ForecastModelHandle::new(&path);
        handle.install(sample_artifact()).unwrap();
        assert!(handle.current().is_some());

        std::fs::remove_file(&path).unwrap();
        assert!(handle.refresh().unwrap().is_none());
        assert!(handle.current().is_none());
    }
}
