use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type returned by collaborator adapters (detectors, predictors, encoders, I/O).
///
/// `Send + Sync` so failures can cross batch worker threads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure taxonomy for one image-processing call.
///
/// Which variants abort an image and which are isolated is decided by the
/// orchestrator: load, detect and persist failures abort the image; predictor,
/// encoding and crop failures are contained to one predictor or one face.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("detector '{detector}' failed: {source}")]
    Detector {
        detector: String,
        #[source]
        source: BoxError,
    },
    #[error("predictor '{predictor}' failed: {source}")]
    Predictor {
        predictor: String,
        #[source]
        source: BoxError,
    },
    #[error("face encoding failed: {0}")]
    Encoding(#[source] BoxError),
    #[error("invalid face crop ({x1}, {y1}, {x2}, {y2}) in {width}x{height} image")]
    Crop {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        width: u32,
        height: u32,
    },
    #[error("rendering failed: {0}")]
    Render(#[source] BoxError),
    #[error("failed to persist results for {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("image processing timed out after {0:?}")]
    Timeout(Duration),
    #[error("processing thread panicked on {0}")]
    Panicked(PathBuf),
    #[error("processing of {0} was cancelled")]
    Cancelled(PathBuf),
}
