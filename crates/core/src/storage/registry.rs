use crate::domain::expense::UserId;
use crate::error::ForecastError;
use crate::model::ModelArtifact;
use crate::storage::lock::KeyLocks;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a persisted model: one artifact per (user, category).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelKey {
    pub user_id: UserId,
    pub category: String,
}

impl ModelKey {
    /// Both parts are required; without either there is nothing to persist or look up.
    pub fn from_parts(user_id: Option<&UserId>, category: Option<&str>) -> Option<Self> {
        Some(Self {
            user_id: user_id?.clone(),
            category: category?.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "model_{}_{}.json",
            sanitize(&self.user_id.to_string()),
            sanitize(&self.category)
        )
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.category)
    }
}

// Spaces become underscores; path separators too so a key never escapes the root.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

pub trait ModelStore: Send + Sync {
    /// `Ok(None)` when nothing was saved for `key`; `Err(ModelLoad)` when the artifact
    /// exists but cannot be read back.
    fn load(&self, key: &ModelKey) -> Result<Option<ModelArtifact>, ForecastError>;

    /// Replaces any artifact previously saved under `key`.
    fn save(&self, key: &ModelKey, artifact: &ModelArtifact) -> Result<PathBuf, ForecastError>;
}

/// JSON artifacts in a single directory, one file per key.
#[derive(Debug)]
pub struct FileModelRegistry {
    root: PathBuf,
    locks: KeyLocks,
}

impl FileModelRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: KeyLocks::default(),
        }
    }

    pub fn init(&self) -> Result<(), ForecastError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            ForecastError::Storage(format!("failed to create {}: {e}", self.root.display()))
        })?;
        tracing::info!(root = %self.root.display(), "model registry ready");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ModelKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl ModelStore for FileModelRegistry {
    fn load(&self, key: &ModelKey) -> Result<Option<ModelArtifact>, ForecastError> {
        let path = self.path_for(key);
        let _guard = self.locks.lock(&key.file_name());

        if !path.exists() {
            return Ok(None);
        }

        let load_error = |detail: String| ForecastError::ModelLoad {
            path: path.display().to_string(),
            detail,
        };
        let text = std::fs::read_to_string(&path).map_err(|e| load_error(e.to_string()))?;
        let artifact = serde_json::from_str::<ModelArtifact>(&text)
            .map_err(|e| load_error(format!("corrupt artifact: {e}")))?;

        tracing::info!(%key, path = %path.display(), model = %artifact.model_name, "loaded saved model");
        Ok(Some(artifact))
    }

    fn save(&self, key: &ModelKey, artifact: &ModelArtifact) -> Result<PathBuf, ForecastError> {
        let path = self.path_for(key);
        let _guard = self.locks.lock(&key.file_name());

        let body = serde_json::to_vec(artifact)
            .map_err(|e| ForecastError::Storage(format!("failed to serialize model: {e}")))?;

        std::fs::create_dir_all(&self.root).map_err(|e| {
            ForecastError::Storage(format!("failed to create {}: {e}", self.root.display()))
        })?;

        // Write beside the target and rename so readers never see a partial file.
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key.file_name(), uuid::Uuid::new_v4()));
        if let Err(e) = std::fs::write(&tmp, &body).and_then(|_| std::fs::rename(&tmp, &path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ForecastError::Storage(format!(
                "failed to write {}: {e}",
                path.display()
            )));
        }

        tracing::info!(%key, path = %path.display(), model = %artifact.model_name, "saved model");
        Ok(path)
    }
}
