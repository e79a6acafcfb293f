use crate::shared::error::AnalysisError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// One face to draw, in original image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub face: FaceBox,
    pub color: [u8; 3],
    /// Drawn above the box on a `color` background; boxes-only faces have none.
    pub label: Option<String>,
}

/// Draws face overlays and a summary header onto a normalised canvas.
pub trait FaceRenderer: Send + Sync {
    /// `header` lines are separated by `\n`; an empty line still takes up
    /// header height.
    fn render(&self, image: &Frame, overlays: &[Overlay], header: &str)
        -> Result<Frame, AnalysisError>;
}
