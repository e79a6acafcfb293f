use std::path::Path;

use crate::shared::error::BoxError;
use crate::shared::face_box::BoundingBox;
use crate::shared::frame::Frame;

/// Which input a detector wants to consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputShape {
    /// The decoded in-memory frame.
    Frame,
    /// The original file on disk (the detector decodes it itself).
    Path,
}

/// What the aggregator hands a detector for one image.
#[derive(Clone, Copy, Debug)]
pub enum DetectionSource<'a> {
    Frame(&'a Frame),
    Path(&'a Path),
}

/// Domain interface for one face detection model.
///
/// Must return an empty list when no faces are found and reserve `Err` for
/// genuine failures (missing or corrupt model, undecodable input).
pub trait FaceDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Declares the preferred input. Path detectors still receive a frame
    /// when the caller has no file path.
    fn input_shape(&self) -> InputShape {
        InputShape::Frame
    }

    fn detect(&self, source: DetectionSource<'_>) -> Result<Vec<BoundingBox>, BoxError>;
}
