use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::detection::domain::face_detector::{DetectionSource, FaceDetector};
use crate::shared::error::BoxError;
use crate::shared::face_box::BoundingBox;
use crate::shared::frame::Frame;

const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESH: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const WINDOW_STEP: u32 = 4;

/// Frontal face detector backed by `rustface` (SeetaFace cascade).
///
/// The engine's detector is stateful and not `Sync`, so a fresh one is built
/// from the shared model on every call.
pub struct SeetaFaceDetector {
    model: rustface::Model,
}

impl SeetaFaceDetector {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let file = File::open(model_path)?;
        let model = rustface::read_model(BufReader::new(file))?;
        log::info!("Loaded SeetaFace model {}", model_path.display());
        Ok(Self { model })
    }

    fn detect_frame(&self, frame: &Frame) -> Result<Vec<BoundingBox>, BoxError> {
        let gray = image::imageops::grayscale(&frame.to_rgb_image());

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESH);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(
            gray.as_raw(),
            gray.width(),
            gray.height(),
        ));

        Ok(faces.iter().map(|face| to_bounding_box(face.bbox())).collect())
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn name(&self) -> &str {
        "seeta"
    }

    fn detect(&self, source: DetectionSource<'_>) -> Result<Vec<BoundingBox>, BoxError> {
        match source {
            DetectionSource::Frame(frame) => self.detect_frame(frame),
            DetectionSource::Path(path) => {
                self.detect_frame(&Frame::from(image::open(path)?.to_rgb8()))
            }
        }
    }
}

fn to_bounding_box(rect: &rustface::Rectangle) -> BoundingBox {
    let x = rect.x() as f64;
    let y = rect.y() as f64;
    BoundingBox::new(x, y, x + rect.width() as f64, y + rect.height() as f64)
}
