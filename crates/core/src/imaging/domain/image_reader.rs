use std::path::Path;

use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;

/// Decodes an image file into an RGB frame.
pub trait ImageReader: Send + Sync {
    /// Fails with `AnalysisError::ImageLoad` for missing, corrupt or
    /// unsupported files.
    fn read(&self, path: &Path) -> Result<Frame, AnalysisError>;
}
