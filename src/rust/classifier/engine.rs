use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use image::DynamicImage;
use serde::Serialize;
use tokio::sync::Mutex;

use super::builder::PlasticClassifierBuilder;
use super::config::EngineConfig;
use super::decision::{decide, ClassificationResult};
use super::error::ClassifierError;
use super::normalizer::{ImageNormalizer, ImageTensor};
use super::properties::ImageStatistics;
use super::recognizer::{ModelLoader, OnnxModelLoader, RecognitionModel};
use super::scoring::{score_categories, CategoryScores, RecognitionLabel};
use super::signature::REGISTRY_ORDER;
use super::ClassifierInfo;

/// Lifecycle of the recognition model held by a [`PlasticClassifier`].
///
/// `Unloaded -> Loading -> Ready`, `Ready -> Loading` on reload, and
/// `Loading -> LoadFailed` on error. `LoadFailed` only moves back to `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::LoadFailed => "load failed",
        };
        f.write_str(name)
    }
}

enum Slot<M> {
    Unloaded,
    Loading,
    Ready(Arc<M>),
    LoadFailed(String),
}

impl<M> Slot<M> {
    fn state(&self) -> ModelState {
        match self {
            Self::Unloaded => ModelState::Unloaded,
            Self::Loading => ModelState::Loading,
            Self::Ready(_) => ModelState::Ready,
            Self::LoadFailed(_) => ModelState::LoadFailed,
        }
    }
}

/// Marks an in-flight load as failed if its future is dropped before completing.
struct LoadingGuard<'a, M> {
    slot: &'a RwLock<Slot<M>>,
    armed: bool,
}

impl<M> LoadingGuard<'_, M> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<M> Drop for LoadingGuard<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Model load was cancelled before completing");
            *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
                Slot::LoadFailed("load cancelled".to_string());
        }
    }
}

/// The plastic classification service.
///
/// Owns the recognition model handle and its lifecycle. Construct it once and
/// share it (for example behind an `Arc`); classification calls are
/// independent and may run concurrently.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use plastic_id::{BuiltinModel, PlasticClassifier};
///
/// let classifier = PlasticClassifier::builder()
///     .with_model(BuiltinModel::MobileNetV2)?
///     .with_confidence_threshold(0.5)
///     .build()?;
///
/// if classifier.load_model().await {
///     let image = image::open("bottle.jpg")?;
///     let result = classifier.classify_image(&image).await;
///     println!("{} ({:.2})", result.category, result.confidence);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PlasticClassifier<L: ModelLoader = OnnxModelLoader> {
    loader: L,
    config: EngineConfig,
    normalizer: ImageNormalizer,
    slot: RwLock<Slot<L::Model>>,
    load_lock: Mutex<()>,
    inference_lock: Arc<Mutex<()>>,
    loads_completed: AtomicU64,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<PlasticClassifier>();
    }
};

impl PlasticClassifier {
    /// Creates a new PlasticClassifierBuilder for fluent construction
    pub fn builder() -> PlasticClassifierBuilder {
        PlasticClassifierBuilder::new()
    }
}

impl<L: ModelLoader> PlasticClassifier<L> {
    /// Creates an engine in the `Unloaded` state.
    ///
    /// # Errors
    /// - `ValidationError` if the configuration is rejected by [`EngineConfig::validate`]
    pub fn new(loader: L, config: EngineConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        Ok(Self {
            loader,
            normalizer: config.normalizer(),
            config,
            slot: RwLock::new(Slot::Unloaded),
            load_lock: Mutex::new(()),
            inference_lock: Arc::new(Mutex::new(())),
            loads_completed: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn state(&self) -> ModelState {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// The diagnostic of the most recent failed load, while in `LoadFailed`.
    pub fn last_load_error(&self) -> Option<String> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::LoadFailed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            state: self.state(),
            categories: REGISTRY_ORDER.to_vec(),
            confidence_threshold: self.config.confidence_threshold,
            image_size: self.config.image_size,
            top_k: self.config.top_k,
        }
    }

    fn set_slot(&self, slot: Slot<L::Model>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = slot;
    }

    /// Loads (or reloads) the recognition model.
    ///
    /// Only one load runs at a time. A call that waited behind a concurrent
    /// load which succeeded returns `true` without loading again.
    pub async fn load_model(&self) -> bool {
        let observed = self.loads_completed.load(Ordering::Acquire);
        let _load = self.load_lock.lock().await;
        if self.loads_completed.load(Ordering::Acquire) != observed && self.is_ready() {
            log::debug!("Model load coalesced with a concurrent load");
            return true;
        }

        log::info!("Loading recognition model (state: {})", self.state());
        self.set_slot(Slot::Loading);
        let mut guard = LoadingGuard {
            slot: &self.slot,
            armed: true,
        };
        let result = self.loader.load(&self.config).await;
        guard.disarm();

        match result {
            Ok(model) => {
                self.set_slot(Slot::Ready(Arc::new(model)));
                self.loads_completed.fetch_add(1, Ordering::AcqRel);
                log::info!("Recognition model ready");
                true
            }
            Err(e) => {
                log::error!("Error loading model: {}", e);
                self.set_slot(Slot::LoadFailed(e.to_string()));
                false
            }
        }
    }

    fn ready_model(&self) -> Result<Arc<L::Model>, ClassifierError> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Ready(model) => Ok(Arc::clone(model)),
            other => Err(ClassifierError::ModelNotReady(other.state())),
        }
    }

    /// Classifies a decoded image. Never fails: every error degrades to
    /// `(UNKNOWN, 0)` and is logged.
    pub async fn classify_image(&self, image: &DynamicImage) -> ClassificationResult {
        let result = self.try_classify(image).await;
        Self::fail_soft(result)
    }

    /// Decodes and classifies an image file, degrading errors like [`Self::classify_image`].
    pub async fn classify_file(&self, path: impl AsRef<Path>) -> ClassificationResult {
        let result = self.try_classify_file(path).await;
        Self::fail_soft(result)
    }

    fn fail_soft(result: Result<ClassificationResult, ClassifierError>) -> ClassificationResult {
        match result {
            Ok(result) => result,
            Err(e @ ClassifierError::ModelNotReady(_)) | Err(e @ ClassifierError::InvalidImage(_)) => {
                log::warn!("Classification skipped: {}", e);
                ClassificationResult::unknown()
            }
            Err(e) => {
                log::error!("Error classifying image: {}", e);
                ClassificationResult::unknown()
            }
        }
    }

    /// Runs the full pipeline and surfaces the failure instead of degrading it.
    pub async fn try_classify(&self, image: &DynamicImage) -> Result<ClassificationResult, ClassifierError> {
        let model = self.ready_model()?;
        let stats = ImageStatistics::from_image(image)?;
        let tensor = self.normalizer.normalize(image)?;
        let labels = self.recognize(model, tensor).await?;
        log::debug!("Recognition labels: {:?}", labels);
        Ok(self.evaluate(&labels, &stats))
    }

    pub async fn try_classify_file(&self, path: impl AsRef<Path>) -> Result<ClassificationResult, ClassifierError> {
        self.ready_model()?;
        let path = path.as_ref().to_path_buf();
        let image = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| ClassifierError::InvalidImage(format!("Image decoding task failed: {}", e)))??;
        self.try_classify(&image).await
    }

    async fn recognize(
        &self,
        model: Arc<L::Model>,
        tensor: ImageTensor,
    ) -> Result<Vec<RecognitionLabel>, ClassifierError> {
        let permit = if self.config.serialize_inference {
            Some(Arc::clone(&self.inference_lock).lock_owned().await)
        } else {
            None
        };
        let top_k = self.config.top_k;

        // The tensor and permit move into the task, so both are released when
        // inference finishes even if this future is dropped first.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            model.classify(&tensor, top_k)
        })
        .await
        .map_err(|e| ClassifierError::InferenceError(format!("Inference task failed: {}", e)))?
    }

    /// Scores every category for the given labels and statistics.
    pub fn score(&self, labels: &[RecognitionLabel], stats: &ImageStatistics) -> CategoryScores {
        score_categories(labels, stats, &self.config.weights)
    }

    /// Scoring and decision only, for callers that run recognition themselves.
    pub fn evaluate(&self, labels: &[RecognitionLabel], stats: &ImageStatistics) -> ClassificationResult {
        let scores = self.score(labels, stats);
        log::debug!("Category scores: {:?}", scores);
        decide(&scores, self.config.confidence_threshold)
    }
}
