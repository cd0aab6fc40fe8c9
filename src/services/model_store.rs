use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

use super::{
    catalog::Catalog,
    classifier::TrainingError,
    scorer::{Scorer, TrainedModel},
};

/// Bump when the serialized model layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Error types for model persistence and startup
#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("Failed to access model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported model artifact version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Model artifact is malformed: {0}")]
    Malformed(TrainingError),
    #[error("Model training failed: {0}")]
    Training(#[from] TrainingError),
    #[error("Model build task failed: {0}")]
    BuildTask(String),
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format_version: u32,
    model: &'a TrainedModel,
}

#[derive(Deserialize)]
struct Artifact {
    format_version: u32,
    model: TrainedModel,
}

/// Where a scorer's model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Loaded,
    Built,
}

/// A ready-to-use scorer
#[derive(Debug, Clone)]
pub struct ScorerHandle {
    scorer: Arc<Scorer>,
    source: ModelSource,
}

impl ScorerHandle {
    pub fn scorer(&self) -> Arc<Scorer> {
        Arc::clone(&self.scorer)
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }
}

/// Reads a model artifact from disk and checks it is safe to score with
pub fn load_artifact(path: &Path) -> Result<TrainedModel, ModelStoreError> {
    let json = std::fs::read_to_string(path).map_err(|source| ModelStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: Artifact = serde_json::from_str(&json)?;

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ModelStoreError::UnsupportedVersion {
            found: artifact.format_version,
            expected: ARTIFACT_FORMAT_VERSION,
        });
    }

    artifact
        .model
        .classifier
        .validate()
        .map_err(ModelStoreError::Malformed)?;

    Ok(artifact.model)
}

/// Writes a model artifact, replacing any existing file atomically
pub fn save_artifact(path: &Path, model: &TrainedModel) -> Result<(), ModelStoreError> {
    let io_err = |source: std::io::Error| ModelStoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string(&ArtifactRef {
        format_version: ARTIFACT_FORMAT_VERSION,
        model,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }

    Ok(())
}

/// Trains a fresh model from the catalog
pub fn build_model(catalog: &Catalog, bandwidth: f64) -> Result<TrainedModel, ModelStoreError> {
    Ok(TrainedModel::train(catalog, bandwidth)?)
}

/// Loads the persisted model when it still matches the catalog, otherwise
/// trains a new one and persists it
///
/// Failing to write the artifact is logged and does not fail startup.
pub fn load_or_build(
    catalog: Arc<Catalog>,
    path: &Path,
    bandwidth: f64,
) -> Result<ScorerHandle, ModelStoreError> {
    if path.exists() {
        match load_artifact(path) {
            Ok(model) if is_reusable(&model, &catalog, bandwidth) => {
                tracing::info!(path = %path.display(), "Crop recommendation model loaded");
                return Ok(ScorerHandle {
                    scorer: Arc::new(Scorer::new(catalog, model)),
                    source: ModelSource::Loaded,
                });
            }
            Ok(_) => {
                tracing::warn!(
                    path = %path.display(),
                    "Model artifact does not match the crop catalog, rebuilding"
                );
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Model artifact unusable, rebuilding");
            }
        }
    }

    let model = build_model(&catalog, bandwidth)?;

    match save_artifact(path, &model) {
        Ok(()) => tracing::info!(path = %path.display(), "Crop recommendation model trained and saved"),
        Err(e) => tracing::error!(error = %e, "Failed to save model artifact"),
    }

    Ok(ScorerHandle {
        scorer: Arc::new(Scorer::new(catalog, model)),
        source: ModelSource::Built,
    })
}

fn is_reusable(model: &TrainedModel, catalog: &Catalog, bandwidth: f64) -> bool {
    let stored = model.classifier.bandwidth();
    model.is_consistent_with(catalog) && (stored - bandwidth).abs() <= 1e-12 * bandwidth.abs()
}

/// Lazily initialised, shared scorer
///
/// Initialisation runs [`load_or_build`] on the blocking pool from a detached
/// task, so it completes even when the caller that started it is dropped.
/// Concurrent callers wait for that result instead of starting their own
/// build. A failed initialisation leaves the provider empty so a later call
/// can retry.
pub struct ScorerProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    catalog: Arc<Catalog>,
    model_path: PathBuf,
    bandwidth: f64,
    cell: OnceCell<ScorerHandle>,
    init_attempts: AtomicUsize,
}

impl ProviderInner {
    async fn initialise(&self) -> Result<Arc<Scorer>, ModelStoreError> {
        let handle = self
            .cell
            .get_or_try_init(|| async {
                self.init_attempts.fetch_add(1, Ordering::SeqCst);
                let catalog = Arc::clone(&self.catalog);
                let path = self.model_path.clone();
                let bandwidth = self.bandwidth;

                tokio::task::spawn_blocking(move || load_or_build(catalog, &path, bandwidth))
                    .await
                    .map_err(|e| ModelStoreError::BuildTask(e.to_string()))
                    .and_then(|built| built)
                    .inspect(|handle| {
                        tracing::info!(source = ?handle.source(), "Crop recommendation scorer ready")
                    })
            })
            .await?;

        Ok(handle.scorer())
    }
}

impl ScorerProvider {
    pub fn new(catalog: Arc<Catalog>, model_path: impl Into<PathBuf>, bandwidth: f64) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                catalog,
                model_path: model_path.into(),
                bandwidth,
                cell: OnceCell::new(),
                init_attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// The reference catalog; available without building the model
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub async fn get(&self) -> Result<Arc<Scorer>, ModelStoreError> {
        if let Some(handle) = self.inner.cell.get() {
            return Ok(handle.scorer());
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.initialise().await })
            .await
            .map_err(|e| ModelStoreError::BuildTask(e.to_string()))?
    }

    pub fn is_ready(&self) -> bool {
        self.inner.cell.initialized()
    }

    /// Number of times initialisation has been started
    pub fn init_attempts(&self) -> usize {
        self.inner.init_attempts.load(Ordering::SeqCst)
    }
}
