use plastic_id::{
    ClassificationResult, ClassifierError, EngineConfig, ImageTensor, ModelLoader, ModelState,
    PlasticCategory, PlasticClassifier, PlasticClassifierBuilder, RecognitionLabel, RecognitionModel,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct StubModel {
    labels: Vec<RecognitionLabel>,
    fail: bool,
    delay: Duration,
}

impl RecognitionModel for StubModel {
    fn classify(&self, _input: &ImageTensor, top_k: usize) -> Result<Vec<RecognitionLabel>, ClassifierError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail {
            return Err(ClassifierError::InferenceError("backend exploded".into()));
        }
        Ok(self.labels.iter().take(top_k).cloned().collect())
    }
}

/// Loader whose first `failures` loads fail. With `hang_first` set, the first load never finishes.
#[derive(Default)]
struct StubLoader {
    labels: Vec<RecognitionLabel>,
    failures: AtomicUsize,
    hang_first: AtomicBool,
    fail_inference: bool,
    inference_delay: Duration,
    loads: Arc<AtomicUsize>,
}

impl StubLoader {
    fn with_labels(labels: Vec<RecognitionLabel>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }
}

impl ModelLoader for StubLoader {
    type Model = StubModel;

    async fn load(&self, _config: &EngineConfig) -> Result<StubModel, ClassifierError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.hang_first.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(ClassifierError::ModelLoadError("network unreachable".into()));
        }
        Ok(StubModel {
            labels: self.labels.clone(),
            fail: self.fail_inference,
            delay: self.inference_delay,
        })
    }
}

fn white_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])))
}

/// Dark checkerboard: opaque and textured.
fn dark_textured_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([120, 120, 120])
        }
    }))
}

fn classifier(loader: StubLoader) -> PlasticClassifier<StubLoader> {
    PlasticClassifier::new(loader, EngineConfig::default()).expect("default config is valid")
}

#[tokio::test]
async fn test_classify_before_load_is_unknown() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]));

    let result = classifier.classify_image(&white_image()).await;
    assert_eq!(result, ClassificationResult::unknown());

    let err = classifier.try_classify(&white_image()).await.unwrap_err();
    assert!(matches!(err, ClassifierError::ModelNotReady(ModelState::Unloaded)));
}

#[tokio::test]
async fn test_water_bottle_is_pet() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]));
    assert!(classifier.load_model().await);

    let result = classifier.classify_image(&white_image()).await;
    assert_eq!(result.category, PlasticCategory::Pet);
    assert!(result.confidence >= classifier.config().confidence_threshold);
    assert!(result.guidance().recyclable);
}

#[tokio::test]
async fn test_pipe_on_dark_textured_image_is_pvc() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("pipe", 0.95)]));
    assert!(classifier.load_model().await);

    let result = classifier.classify_image(&dark_textured_image()).await;
    assert_eq!(result.category, PlasticCategory::Pvc);
}

#[tokio::test]
async fn test_banana_is_unknown() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("banana", 0.99)]));
    assert!(classifier.load_model().await);

    for image in [white_image(), dark_textured_image()] {
        assert_eq!(classifier.classify_image(&image).await, ClassificationResult::unknown());
    }
}

#[tokio::test]
async fn test_classification_is_deterministic() {
    let classifier = classifier(StubLoader::with_labels(vec![
        RecognitionLabel::new("water bottle", 0.7),
        RecognitionLabel::new("pop bottle", 0.2),
    ]));
    assert!(classifier.load_model().await);

    let image = dark_textured_image();
    let first = classifier.classify_image(&image).await;
    let second = classifier.classify_image(&image).await;
    assert_eq!(first.category, second.category);
    assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
}

#[tokio::test]
async fn test_zero_size_image_is_unknown() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]));
    assert!(classifier.load_model().await);

    let empty = DynamicImage::new_rgb8(0, 0);
    assert_eq!(classifier.classify_image(&empty).await, ClassificationResult::unknown());
    assert!(matches!(
        classifier.try_classify(&empty).await,
        Err(ClassifierError::InvalidImage(_))
    ));
}

#[tokio::test]
async fn test_inference_error_degrades_to_unknown() {
    let loader = StubLoader {
        labels: vec![RecognitionLabel::new("water bottle", 0.9)],
        fail_inference: true,
        ..StubLoader::default()
    };
    let classifier = classifier(loader);
    assert!(classifier.load_model().await);

    assert_eq!(classifier.classify_image(&white_image()).await, ClassificationResult::unknown());
    assert!(matches!(
        classifier.try_classify(&white_image()).await,
        Err(ClassifierError::InferenceError(_))
    ));
    assert_eq!(classifier.state(), ModelState::Ready);
}

#[tokio::test]
async fn test_failed_load_can_be_retried() {
    let loader = StubLoader {
        labels: vec![RecognitionLabel::new("water bottle", 0.9)],
        failures: AtomicUsize::new(1),
        ..StubLoader::default()
    };
    let classifier = classifier(loader);

    assert!(!classifier.load_model().await);
    assert_eq!(classifier.state(), ModelState::LoadFailed);
    assert!(classifier.last_load_error().unwrap().contains("network unreachable"));
    assert!(classifier.classify_image(&white_image()).await.is_unknown());

    assert!(classifier.load_model().await);
    assert_eq!(classifier.state(), ModelState::Ready);
    assert!(classifier.last_load_error().is_none());
    assert_eq!(classifier.classify_image(&white_image()).await.category, PlasticCategory::Pet);
}

#[tokio::test]
async fn test_reload_keeps_engine_usable() {
    let loader = StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]);
    let loads = Arc::clone(&loader.loads);
    let classifier = classifier(loader);

    assert!(classifier.load_model().await);
    assert!(classifier.load_model().await);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(classifier.state(), ModelState::Ready);
}

#[tokio::test]
async fn test_concurrent_loads_are_coalesced() {
    let loader = StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]);
    let loads = Arc::clone(&loader.loads);
    let classifier = classifier(loader);

    let (a, b) = tokio::join!(classifier.load_model(), classifier.load_model());
    assert!(a && b);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_load_is_marked_failed() {
    let loader = StubLoader {
        labels: vec![RecognitionLabel::new("water bottle", 0.9)],
        hang_first: AtomicBool::new(true),
        ..StubLoader::default()
    };
    let classifier = classifier(loader);

    let timed_out = tokio::time::timeout(Duration::from_millis(20), classifier.load_model()).await;
    assert!(timed_out.is_err());
    assert_eq!(classifier.state(), ModelState::LoadFailed);

    assert!(classifier.load_model().await);
    assert_eq!(classifier.state(), ModelState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_classification_releases_inference_permit() {
    let loader = StubLoader {
        labels: vec![RecognitionLabel::new("water bottle", 0.9)],
        inference_delay: Duration::from_millis(200),
        ..StubLoader::default()
    };
    let classifier = classifier(loader);
    assert!(classifier.config().serialize_inference);
    assert!(classifier.load_model().await);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), classifier.classify_image(&white_image())).await;
    assert!(abandoned.is_err());

    let result = tokio::time::timeout(Duration::from_secs(5), classifier.classify_image(&white_image()))
        .await
        .expect("second classification should get the inference permit");
    assert_eq!(result.category, PlasticCategory::Pet);
    assert_eq!(classifier.state(), ModelState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_classifications() {
    let classifier = Arc::new(classifier(StubLoader::with_labels(vec![RecognitionLabel::new(
        "water bottle",
        0.9,
    )])));
    assert!(classifier.load_model().await);

    let mut handles = vec![];
    for _ in 0..8 {
        let classifier = Arc::clone(&classifier);
        handles.push(tokio::spawn(async move { classifier.classify_image(&white_image()).await }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.category, PlasticCategory::Pet);
    }
}

#[tokio::test]
async fn test_unserialized_inference() {
    let classifier = PlasticClassifierBuilder::new()
        .with_serialized_inference(false)
        .build_with_loader(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]))
        .unwrap();
    assert!(classifier.load_model().await);
    assert_eq!(classifier.classify_image(&white_image()).await.category, PlasticCategory::Pet);
}

#[tokio::test]
async fn test_classify_missing_file_is_unknown() {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]));
    assert!(classifier.load_model().await);

    let result = classifier.classify_file("/nonexistent/bottle.png").await;
    assert!(result.is_unknown());
    assert!(matches!(
        classifier.try_classify_file("/nonexistent/bottle.png").await,
        Err(ClassifierError::InvalidImage(_))
    ));
}

#[tokio::test]
async fn test_classify_file_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = classifier(StubLoader::with_labels(vec![RecognitionLabel::new("water bottle", 0.9)]));
    assert!(classifier.load_model().await);

    let path = std::env::temp_dir().join("plastic-id-white.png");
    white_image().save(&path)?;
    let result = classifier.classify_file(&path).await;
    std::fs::remove_file(&path)?;

    assert_eq!(result.category, PlasticCategory::Pet);
    Ok(())
}
