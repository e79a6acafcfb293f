use std::path::Path;

use crate::detection::domain::face_detector::{DetectionSource, FaceDetector, InputShape};
use crate::detection::domain::non_max_suppression::{suppress, DEFAULT_OVERLAP_THRESHOLD};
use crate::shared::error::AnalysisError;
use crate::shared::face_box::{BoundingBox, FaceBox};
use crate::shared::frame::Frame;

/// Runs every configured detector on one image and merges the results.
///
/// Detection is fail-fast: if any detector errors the whole step fails.
pub struct DetectionAggregator {
    detectors: Vec<Box<dyn FaceDetector>>,
    overlap_threshold: f64,
}

impl DetectionAggregator {
    pub fn new(detectors: Vec<Box<dyn FaceDetector>>) -> Self {
        Self {
            detectors,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }

    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Pools boxes from all detectors in registration order and deduplicates them.
    pub fn detect_all(
        &self,
        frame: &Frame,
        image_path: Option<&Path>,
    ) -> Result<Vec<FaceBox>, AnalysisError> {
        let mut pooled: Vec<BoundingBox> = Vec::new();

        for detector in &self.detectors {
            let source = match (detector.input_shape(), image_path) {
                (InputShape::Path, Some(path)) => DetectionSource::Path(path),
                _ => DetectionSource::Frame(frame),
            };

            let boxes = detector.detect(source).map_err(|source| {
                log::error!("Detector '{}' failed: {source}", detector.name());
                AnalysisError::Detector {
                    detector: detector.name().to_string(),
                    source,
                }
            })?;
            log::info!("{}: {} faces detected", detector.name(), boxes.len());
            pooled.extend(boxes);
        }

        log::info!("{} raw detections across {} detectors", pooled.len(), self.detectors.len());
        Ok(suppress(&pooled, self.overlap_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::BoxError;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    #[derive(Debug, PartialEq)]
    enum Seen {
        Frame,
        Path(PathBuf),
    }

    struct StubDetector {
        shape: InputShape,
        boxes: Vec<BoundingBox>,
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl StubDetector {
        fn new(shape: InputShape, boxes: Vec<BoundingBox>) -> Self {
            Self {
                shape,
                boxes,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceDetector for StubDetector {
        fn name(&self) -> &str {
            "stub"
        }

        fn input_shape(&self) -> InputShape {
            self.shape
        }

        fn detect(&self, source: DetectionSource<'_>) -> Result<Vec<BoundingBox>, BoxError> {
            let seen = match source {
                DetectionSource::Frame(_) => Seen::Frame,
                DetectionSource::Path(p) => Seen::Path(p.to_path_buf()),
            };
            self.seen.lock().unwrap().push(seen);
            Ok(self.boxes.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&self, _source: DetectionSource<'_>) -> Result<Vec<BoundingBox>, BoxError> {
            Err("model file is corrupt".into())
        }
    }

    // --- Helpers ---

    fn frame() -> Frame {
        Frame::filled(200, 200, [128, 128, 128])
    }

    fn bb(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    // --- Tests ---

    #[test]
    fn test_no_detectors_yields_empty() {
        let aggregator = DetectionAggregator::new(vec![]);
        assert!(aggregator.detect_all(&frame(), None).unwrap().is_empty());
    }

    #[test]
    fn test_detector_names_follow_registration_order() {
        let aggregator = DetectionAggregator::new(vec![
            Box::new(FailingDetector),
            Box::new(StubDetector::new(InputShape::Frame, vec![])),
        ]);
        assert_eq!(aggregator.detector_names(), vec!["failing", "stub"]);
    }

    #[test]
    fn test_detectors_without_faces_yield_empty() {
        let aggregator = DetectionAggregator::new(vec![
            Box::new(StubDetector::new(InputShape::Frame, vec![])),
            Box::new(StubDetector::new(InputShape::Path, vec![])),
        ]);
        assert!(aggregator.detect_all(&frame(), None).unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_boxes_from_two_detectors_merge() {
        let aggregator = DetectionAggregator::new(vec![
            Box::new(StubDetector::new(InputShape::Frame, vec![bb(10.0, 10.0, 50.0, 50.0)])),
            Box::new(StubDetector::new(InputShape::Frame, vec![bb(12.0, 11.0, 52.0, 49.0)])),
        ]);
        let faces = aggregator.detect_all(&frame(), None).unwrap();
        assert_eq!(faces, vec![FaceBox::new(10, 10, 50, 50)]);
    }

    #[test]
    fn test_disjoint_boxes_from_two_detectors_both_kept() {
        let aggregator = DetectionAggregator::new(vec![
            Box::new(StubDetector::new(InputShape::Frame, vec![bb(0.0, 0.0, 10.0, 10.0)])),
            Box::new(StubDetector::new(
                InputShape::Frame,
                vec![bb(100.0, 100.0, 120.0, 120.0)],
            )),
        ]);
        let mut faces = aggregator.detect_all(&frame(), None).unwrap();
        faces.sort_by_key(|f| f.x1);
        assert_eq!(
            faces,
            vec![FaceBox::new(0, 0, 10, 10), FaceBox::new(100, 100, 120, 120)]
        );
    }

    #[test]
    fn test_path_detector_receives_path_when_available() {
        let detector = StubDetector::new(InputShape::Path, vec![]);
        let seen = detector.seen.clone();
        let aggregator = DetectionAggregator::new(vec![Box::new(detector)]);

        aggregator
            .detect_all(&frame(), Some(Path::new("photo.jpg")))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Seen::Path(PathBuf::from("photo.jpg"))]);
    }

    #[test]
    fn test_path_detector_falls_back_to_frame_without_path() {
        let detector = StubDetector::new(InputShape::Path, vec![]);
        let seen = detector.seen.clone();
        let aggregator = DetectionAggregator::new(vec![Box::new(detector)]);

        aggregator.detect_all(&frame(), None).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Seen::Frame]);
    }

    #[test]
    fn test_frame_detector_receives_frame_even_with_path() {
        let detector = StubDetector::new(InputShape::Frame, vec![]);
        let seen = detector.seen.clone();
        let aggregator = DetectionAggregator::new(vec![Box::new(detector)]);

        aggregator
            .detect_all(&frame(), Some(Path::new("photo.jpg")))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Seen::Frame]);
    }

    #[test]
    fn test_detector_failure_aborts_detection() {
        let after = StubDetector::new(InputShape::Frame, vec![bb(0.0, 0.0, 10.0, 10.0)]);
        let after_seen = after.seen.clone();
        let aggregator = DetectionAggregator::new(vec![
            Box::new(StubDetector::new(InputShape::Frame, vec![bb(0.0, 0.0, 10.0, 10.0)])),
            Box::new(FailingDetector),
            Box::new(after),
        ]);

        let err = aggregator.detect_all(&frame(), None).unwrap_err();

        match err {
            AnalysisError::Detector { detector, .. } => assert_eq!(detector, "failing"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(after_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_custom_overlap_threshold_applies() {
        // Ratio against the candidate's area is 30 / 100 = 0.3.
        let aggregator = DetectionAggregator::new(vec![Box::new(StubDetector::new(
            InputShape::Frame,
            vec![bb(0.0, 0.0, 9.0, 9.0), bb(7.0, 0.0, 50.0, 10.0)],
        ))])
        .with_overlap_threshold(0.2);
        assert_eq!(aggregator.detect_all(&frame(), None).unwrap().len(), 1);
    }
}
