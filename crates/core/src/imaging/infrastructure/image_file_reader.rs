use std::path::Path;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;

/// Reads any format the `image` crate can decode, converting to RGB.
pub struct ImageFileReader;

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, AnalysisError> {
        let decoded = image::open(path).map_err(|e| AnalysisError::ImageLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(AnalysisError::ImageLoad {
                path: path.to_path_buf(),
                source: "image has zero dimensions".into(),
            });
        }
        Ok(Frame::from(decoded.to_rgb8()))
    }
}
