use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::detection_aggregator::DetectionAggregator;
use crate::identity::domain::identity_gate::{resolve_label, IdentityGate, IdentityVerdict};
use crate::identity::domain::target_embeddings::TargetEmbeddingSet;
use crate::imaging::domain::image_reader::ImageReader;
use crate::persistence::domain::result_persister::{MatchRoute, ResultPersister};
use crate::pipeline::face_prediction::{FaceAnalysis, FacePrediction};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger, Stage};
use crate::pipeline::summary::Summary;
use crate::prediction::domain::attributes::Attributes;
use crate::prediction::domain::prediction_aggregator::PredictionAggregator;
use crate::rendering::domain::face_renderer::FaceRenderer;
use crate::shared::constants::{
    DEFAULT_BOX_COLOR, DEFAULT_TARGET_LABEL, KEY_AGE, KEY_BOX_COLOR, KEY_GENDER, KEY_RACE, MALE,
    UNKNOWN,
};
use crate::shared::error::AnalysisError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Single-image analysis pipeline:
/// load → detect → per-face (identity, attributes) → summarise → render → persist.
///
/// Stateless between calls, so one instance can serve a whole batch from
/// several threads.
pub struct AnalyzeImageUseCase {
    reader: Box<dyn ImageReader>,
    detection: DetectionAggregator,
    prediction: Option<PredictionAggregator>,
    identity: IdentityGate,
    renderer: Box<dyn FaceRenderer>,
    persister: Box<dyn ResultPersister>,
    target_label: String,
    logger: Arc<dyn PipelineLogger>,
}

impl AnalyzeImageUseCase {
    /// `prediction: None` selects boxes-only mode.
    pub fn new(
        reader: Box<dyn ImageReader>,
        detection: DetectionAggregator,
        prediction: Option<PredictionAggregator>,
        identity: IdentityGate,
        renderer: Box<dyn FaceRenderer>,
        persister: Box<dyn ResultPersister>,
    ) -> Self {
        Self {
            reader,
            detection,
            prediction,
            identity,
            renderer,
            persister,
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            logger: Arc::new(NullPipelineLogger),
        }
    }

    pub fn with_target_label(mut self, label: impl Into<String>) -> Self {
        self.target_label = label.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Processes one image end to end and returns the rendered output path.
    ///
    /// Load, detect, render and persist failures abort this image only; the
    /// error is logged here and handed back to the caller.
    pub fn process_image(
        &self,
        image_path: &Path,
        targets: &TargetEmbeddingSet,
    ) -> Result<PathBuf, AnalysisError> {
        self.process_image_cancellable(image_path, targets, &AtomicBool::new(false))
    }

    /// Like [`process_image`](Self::process_image), but gives up with
    /// [`AnalysisError::Cancelled`] once `cancel` is set. The flag is checked
    /// before rendering and again before persisting, so a cancelled image
    /// never writes output.
    pub fn process_image_cancellable(
        &self,
        image_path: &Path,
        targets: &TargetEmbeddingSet,
        cancel: &AtomicBool,
    ) -> Result<PathBuf, AnalysisError> {
        self.run(image_path, targets, cancel).map_err(|e| {
            log::error!("Skipping {}: {e}", image_path.display());
            e
        })
    }

    fn run(
        &self,
        image_path: &Path,
        targets: &TargetEmbeddingSet,
        cancel: &AtomicBool,
    ) -> Result<PathBuf, AnalysisError> {
        let ensure_live = || {
            if cancel.load(Ordering::Acquire) {
                Err(AnalysisError::Cancelled(image_path.to_path_buf()))
            } else {
                Ok(())
            }
        };

        let frame = self.timed(Stage::Load, || self.reader.read(image_path))?;
        let faces = self.timed(Stage::Detect, || {
            self.detection.detect_all(&frame, Some(image_path))
        })?;
        self.logger.metric("faces_detected", faces.len() as f64);

        let analysis = self.timed(Stage::Analyze, || self.analyze_faces(&frame, &faces, targets));
        let summary = Summary::of(&analysis);
        log::info!(
            "{}: {} faces kept of {} detected",
            image_path.display(),
            summary.face_count,
            faces.len()
        );

        ensure_live()?;
        let rendered = self.timed(Stage::Render, || {
            self.renderer
                .render(&frame, &analysis.overlays(), &summary.header_text())
        })?;

        let route = MatchRoute::from_match(analysis.any_target());
        ensure_live()?;
        let output = self.timed(Stage::Persist, || {
            self.persister.persist(image_path, &rendered, route)
        })?;
        log::info!("Wrote {} ({})", output.display(), route.folder_name());
        Ok(output)
    }

    fn analyze_faces(
        &self,
        frame: &Frame,
        faces: &[FaceBox],
        targets: &TargetEmbeddingSet,
    ) -> FaceAnalysis {
        let Some(prediction) = &self.prediction else {
            return FaceAnalysis::BoxesOnly(faces.to_vec());
        };

        let mut predictions = Vec::with_capacity(faces.len());
        for &face in faces {
            match self.analyze_face(frame, face, targets, prediction) {
                Ok(Some(p)) => predictions.push(p),
                Ok(None) => {
                    log::warn!("Dropping face {face:?}: no embedding");
                    self.logger.metric("faces_dropped", 1.0);
                }
                Err(e) => {
                    log::warn!("Dropping face {face:?}: {e}");
                    self.logger.metric("faces_dropped", 1.0);
                }
            }
        }
        FaceAnalysis::Predicted(predictions)
    }

    /// Identity check plus attribute prediction for one face.
    ///
    /// `Ok(None)` means the face could not be embedded.
    fn analyze_face(
        &self,
        frame: &Frame,
        face: FaceBox,
        targets: &TargetEmbeddingSet,
        prediction: &PredictionAggregator,
    ) -> Result<Option<FacePrediction>, AnalysisError> {
        let crop = frame.crop(&face)?;

        let is_match = match self.identity.evaluate(frame, face, targets)? {
            IdentityVerdict::Unencodable => return Ok(None),
            IdentityVerdict::Checked { is_match } => is_match,
        };

        let attributes = prediction.predict(&crop);
        Ok(Some(self.to_prediction(face, &attributes, is_match)))
    }

    fn to_prediction(&self, face: FaceBox, attributes: &Attributes, is_match: bool) -> FacePrediction {
        let race = attributes.text(KEY_RACE).unwrap_or(UNKNOWN);
        let gender = attributes.text(KEY_GENDER).unwrap_or(UNKNOWN);
        let age = attributes.text(KEY_AGE).unwrap_or(UNKNOWN);
        let box_color = attributes.color(KEY_BOX_COLOR).unwrap_or(DEFAULT_BOX_COLOR);

        FacePrediction {
            face,
            race: race.to_string(),
            gender: gender.to_string(),
            box_color,
            label: resolve_label(is_match, gender, age, &self.target_label).to_string(),
            is_target: is_match && gender == MALE,
        }
    }

    fn timed<T>(&self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.logger
            .timing(stage, start.elapsed().as_secs_f64() * 1000.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{DetectionSource, FaceDetector};
    use crate::identity::domain::face_encoder::FaceEncoder;
    use crate::pipeline::pipeline_logger::StageTimingLogger;
    use crate::prediction::domain::attribute_predictor::AttributePredictor;
    use crate::rendering::domain::face_renderer::Overlay;
    use crate::shared::constants::{BOXES_ONLY_COLOR, FEMALE, FEMALE_BOX_COLOR, MALE_BOX_COLOR};
    use crate::shared::error::BoxError;
    use crate::shared::face_box::{BoundingBox, FaceLocation};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubReader {
        frame: Option<Frame>,
    }

    impl ImageReader for StubReader {
        fn read(&self, path: &Path) -> Result<Frame, AnalysisError> {
            self.frame.clone().ok_or_else(|| AnalysisError::ImageLoad {
                path: path.to_path_buf(),
                source: "missing".into(),
            })
        }
    }

    struct StubDetector {
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for StubDetector {
        fn name(&self) -> &str {
            "stub"
        }

        fn detect(
            &self,
            _source: DetectionSource<'_>,
        ) -> Result<Vec<BoundingBox>, BoxError> {
            Ok(self.boxes.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn name(&self) -> &str {
            "broken"
        }

        fn detect(
            &self,
            _source: DetectionSource<'_>,
        ) -> Result<Vec<BoundingBox>, BoxError> {
            Err("model file is corrupt".into())
        }
    }

    /// Returns a fixed embedding per face, keyed by the face's left edge.
    /// Faces without an entry are unencodable.
    struct StubEncoder {
        by_left: HashMap<i32, Vec<f32>>,
    }

    impl FaceEncoder for StubEncoder {
        fn encode(&self, _image: &Frame, location: FaceLocation) -> Result<Option<Vec<f32>>, BoxError> {
            Ok(self.by_left.get(&location.left).cloned())
        }
    }

    struct StubPredictor {
        name: &'static str,
        attributes: Attributes,
    }

    impl AttributePredictor for StubPredictor {
        fn name(&self) -> &str {
            self.name
        }

        fn predict(&self, _face: &Frame) -> Result<Attributes, BoxError> {
            Ok(self.attributes.clone())
        }
    }

    struct FailingPredictor;

    impl AttributePredictor for FailingPredictor {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _face: &Frame) -> Result<Attributes, BoxError> {
            Err("inference failed".into())
        }
    }

    #[derive(Clone, Debug)]
    struct RenderCall {
        overlays: Vec<Overlay>,
        header: String,
    }

    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<RenderCall>>>,
    }

    impl FaceRenderer for RecordingRenderer {
        fn render(&self, image: &Frame, overlays: &[Overlay], header: &str) -> Result<Frame, AnalysisError> {
            self.calls.lock().unwrap().push(RenderCall {
                overlays: overlays.to_vec(),
                header: header.to_string(),
            });
            Ok(image.clone())
        }
    }

    struct RecordingPersister {
        routes: Arc<Mutex<Vec<MatchRoute>>>,
    }

    impl ResultPersister for RecordingPersister {
        fn persist(&self, source: &Path, _rendered: &Frame, route: MatchRoute) -> Result<PathBuf, AnalysisError> {
            self.routes.lock().unwrap().push(route);
            Ok(PathBuf::from("results").join(source.file_name().unwrap()))
        }
    }

    struct FailingPersister;

    impl ResultPersister for FailingPersister {
        fn persist(&self, source: &Path, _rendered: &Frame, _route: MatchRoute) -> Result<PathBuf, AnalysisError> {
            Err(AnalysisError::Persistence {
                path: source.to_path_buf(),
                source: "disk full".into(),
            })
        }
    }

    // --- Helpers ---

    const TARGET: [f32; 2] = [1.0, 0.0];
    const STRANGER: [f32; 2] = [0.0, 1.0];

    struct Harness {
        renders: Arc<Mutex<Vec<RenderCall>>>,
        routes: Arc<Mutex<Vec<MatchRoute>>>,
    }

    impl Harness {
        fn last_render(&self) -> RenderCall {
            self.renders.lock().unwrap().last().cloned().unwrap()
        }

        fn routes(&self) -> Vec<MatchRoute> {
            self.routes.lock().unwrap().clone()
        }
    }

    fn targets() -> TargetEmbeddingSet {
        TargetEmbeddingSet::new(vec![TARGET.to_vec()]).unwrap()
    }

    fn attrs(gender: &str, age: &str) -> Attributes {
        let color = if gender == MALE { MALE_BOX_COLOR } else { FEMALE_BOX_COLOR };
        Attributes::new()
            .with(KEY_RACE, "아시아")
            .with(KEY_GENDER, gender)
            .with(KEY_AGE, age)
            .with(KEY_BOX_COLOR, color)
    }

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    fn build(
        detectors: Vec<Box<dyn FaceDetector>>,
        predictors: Option<Vec<Box<dyn AttributePredictor>>>,
        embeddings: Vec<(i32, [f32; 2])>,
    ) -> (AnalyzeImageUseCase, Harness) {
        let renders = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(Mutex::new(Vec::new()));
        let encoder = StubEncoder {
            by_left: embeddings.into_iter().map(|(x, e)| (x, e.to_vec())).collect(),
        };
        let use_case = AnalyzeImageUseCase::new(
            Box::new(StubReader {
                frame: Some(Frame::filled(200, 200, [90, 90, 90])),
            }),
            DetectionAggregator::new(detectors),
            predictors.map(PredictionAggregator::new),
            IdentityGate::new(Box::new(encoder), 0.3),
            Box::new(RecordingRenderer {
                calls: renders.clone(),
            }),
            Box::new(RecordingPersister {
                routes: routes.clone(),
            }),
        );
        (use_case, Harness { renders, routes })
    }

    fn single_face(predictor_attrs: Attributes, embedding: [f32; 2]) -> (AnalyzeImageUseCase, Harness) {
        build(
            vec![Box::new(StubDetector {
                boxes: vec![bbox(20.0, 20.0, 80.0, 90.0)],
            })],
            Some(vec![Box::new(StubPredictor {
                name: "stub",
                attributes: predictor_attrs,
            })]),
            vec![(20, embedding)],
        )
    }

    // --- Tests ---

    #[test]
    fn test_matched_male_face_gets_target_label() {
        let (uc, h) = single_face(attrs(MALE, "30대"), TARGET);

        let out = uc.process_image(Path::new("in/photo.jpg"), &targets()).unwrap();

        assert_eq!(out, PathBuf::from("results/photo.jpg"));
        let render = h.last_render();
        assert_eq!(render.overlays[0].label.as_deref(), Some(DEFAULT_TARGET_LABEL));
        assert_eq!(render.overlays[0].color, MALE_BOX_COLOR);
        assert_eq!(h.routes(), vec![MatchRoute::Target]);
    }

    #[test]
    fn test_matched_female_face_falls_back_to_age() {
        let (uc, h) = single_face(attrs(FEMALE, "20대"), TARGET);

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        assert_eq!(h.last_render().overlays[0].label.as_deref(), Some("20대"));
        assert_eq!(h.routes(), vec![MatchRoute::NonTarget]);
    }

    #[test]
    fn test_unmatched_male_face_gets_age_label() {
        let (uc, h) = single_face(attrs(MALE, "40대"), STRANGER);

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        assert_eq!(h.last_render().overlays[0].label.as_deref(), Some("40대"));
        assert_eq!(h.routes(), vec![MatchRoute::NonTarget]);
    }

    #[test]
    fn test_custom_target_label() {
        let (uc, h) = single_face(attrs(MALE, "30대"), TARGET);
        let uc = uc.with_target_label("TARGET");

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        assert_eq!(h.last_render().overlays[0].label.as_deref(), Some("TARGET"));
    }

    #[test]
    fn test_failing_detector_aborts_image_without_output() {
        let (uc, h) = build(
            vec![
                Box::new(StubDetector {
                    boxes: vec![bbox(20.0, 20.0, 80.0, 90.0)],
                }),
                Box::new(FailingDetector),
            ],
            Some(vec![]),
            vec![(20, TARGET)],
        );

        let result = uc.process_image(Path::new("photo.jpg"), &targets());

        assert!(matches!(result, Err(AnalysisError::Detector { ref detector, .. }) if detector == "broken"));
        assert!(h.renders.lock().unwrap().is_empty());
        assert!(h.routes().is_empty());
    }

    #[test]
    fn test_failing_predictor_is_skipped() {
        let (uc, h) = build(
            vec![Box::new(StubDetector {
                boxes: vec![bbox(20.0, 20.0, 80.0, 90.0)],
            })],
            Some(vec![
                Box::new(FailingPredictor),
                Box::new(StubPredictor {
                    name: "stub",
                    attributes: attrs(FEMALE, "50대"),
                }),
            ]),
            vec![(20, STRANGER)],
        );

        let out = uc.process_image(Path::new("photo.jpg"), &targets());

        assert!(out.is_ok());
        let render = h.last_render();
        assert_eq!(render.overlays.len(), 1);
        assert_eq!(render.overlays[0].label.as_deref(), Some("50대"));
        assert_eq!(render.overlays[0].color, FEMALE_BOX_COLOR);
    }

    #[test]
    fn test_load_failure_is_reported() {
        let (mut uc, h) = single_face(attrs(MALE, "30대"), TARGET);
        uc.reader = Box::new(StubReader { frame: None });

        let result = uc.process_image(Path::new("missing.jpg"), &targets());

        assert!(matches!(result, Err(AnalysisError::ImageLoad { .. })));
        assert!(h.renders.lock().unwrap().is_empty());
    }

    #[test]
    fn test_persist_failure_fails_image() {
        let (mut uc, _h) = single_face(attrs(MALE, "30대"), TARGET);
        uc.persister = Box::new(FailingPersister);

        let result = uc.process_image(Path::new("photo.jpg"), &targets());

        assert!(matches!(result, Err(AnalysisError::Persistence { .. })));
    }

    #[test]
    fn test_unencodable_face_is_dropped_from_summary() {
        let (uc, h) = build(
            vec![Box::new(StubDetector {
                boxes: vec![bbox(20.0, 20.0, 60.0, 60.0), bbox(120.0, 120.0, 160.0, 160.0)],
            })],
            Some(vec![Box::new(StubPredictor {
                name: "stub",
                attributes: attrs(MALE, "30대"),
            })]),
            // Only the first face can be embedded.
            vec![(20, STRANGER)],
        );

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        let render = h.last_render();
        assert_eq!(render.overlays.len(), 1);
        assert!(render.header.starts_with("검출된 인원 수: 1명\n"));
    }

    #[test]
    fn test_face_outside_image_is_isolated() {
        let (uc, h) = build(
            vec![Box::new(StubDetector {
                boxes: vec![bbox(20.0, 20.0, 60.0, 60.0), bbox(300.0, 300.0, 340.0, 340.0)],
            })],
            Some(vec![Box::new(StubPredictor {
                name: "stub",
                attributes: attrs(MALE, "30대"),
            })]),
            vec![(20, STRANGER), (300, STRANGER)],
        );

        assert!(uc.process_image(Path::new("photo.jpg"), &targets()).is_ok());
        assert_eq!(h.last_render().overlays.len(), 1);
    }

    #[test]
    fn test_missing_attributes_default_to_unknown() {
        let (uc, h) = single_face(Attributes::new(), TARGET);

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        let render = h.last_render();
        assert_eq!(render.overlays[0].label.as_deref(), Some(UNKNOWN));
        assert_eq!(render.overlays[0].color, DEFAULT_BOX_COLOR);
        // Unknown gender never earns the target label.
        assert_eq!(h.routes(), vec![MatchRoute::NonTarget]);
    }

    #[test]
    fn test_boxes_only_mode_skips_identity_and_breakdown() {
        let (uc, h) = build(
            vec![Box::new(StubDetector {
                boxes: vec![bbox(20.0, 20.0, 60.0, 60.0), bbox(120.0, 120.0, 160.0, 160.0)],
            })],
            None,
            vec![],
        );

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        let render = h.last_render();
        assert_eq!(render.header, "검출된 인원 수: 2명\n");
        assert!(render
            .overlays
            .iter()
            .all(|o| o.color == BOXES_ONLY_COLOR && o.label.is_none()));
        assert_eq!(h.routes(), vec![MatchRoute::NonTarget]);
    }

    #[test]
    fn test_header_carries_breakdown() {
        let (uc, h) = single_face(attrs(MALE, "30대"), STRANGER);

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        assert_eq!(
            h.last_render().header,
            "검출된 인원 수: 1명\n남성: 1명\n여성: 0명\n아시아: 1명"
        );
    }

    #[test]
    fn test_cancelled_image_is_neither_rendered_nor_persisted() {
        let (uc, h) = single_face(attrs(MALE, "30대"), TARGET);
        let cancel = AtomicBool::new(true);

        let result = uc.process_image_cancellable(Path::new("photo.jpg"), &targets(), &cancel);

        assert!(matches!(result, Err(AnalysisError::Cancelled(ref p)) if p == Path::new("photo.jpg")));
        assert!(h.renders.lock().unwrap().is_empty());
        assert!(h.routes().is_empty());
    }

    #[test]
    fn test_stage_timings_are_recorded() {
        let logger = Arc::new(StageTimingLogger::new());
        let (uc, _h) = single_face(attrs(MALE, "30대"), STRANGER);
        let uc = uc.with_logger(logger.clone());

        uc.process_image(Path::new("photo.jpg"), &targets()).unwrap();

        for stage in [Stage::Load, Stage::Detect, Stage::Analyze, Stage::Render, Stage::Persist] {
            assert_eq!(logger.timings_for(stage).len(), 1, "{stage:?}");
        }
        assert_eq!(logger.metrics_for("faces_detected"), vec![1.0]);
    }
}
