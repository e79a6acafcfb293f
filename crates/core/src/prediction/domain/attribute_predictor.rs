use crate::prediction::domain::attributes::Attributes;
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;

/// Domain interface for one attribute model applied to a cropped face.
///
/// Low-confidence results are still `Ok` (best effort); `Err` is reserved
/// for genuine failures such as an unusable crop or a broken model.
pub trait AttributePredictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, face: &Frame) -> Result<Attributes, BoxError>;
}
