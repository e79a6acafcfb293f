use crate::shared::error::BoxError;
use crate::shared::face_box::FaceLocation;
use crate::shared::frame::Frame;

/// Domain interface for a face embedding model.
pub trait FaceEncoder: Send + Sync {
    /// Embeds the face at `location` within the full `image`.
    ///
    /// `Ok(None)` means the region could not be encoded (too small or
    /// degenerate); `Err` is a genuine model failure.
    fn encode(&self, image: &Frame, location: FaceLocation) -> Result<Option<Vec<f32>>, BoxError>;

    /// True when `candidate` lies within `tolerance` of any reference.
    ///
    /// Defaults to Euclidean distance. A reference of a different length never
    /// matches.
    fn compare(&self, references: &[Vec<f32>], candidate: &[f32], tolerance: f64) -> bool {
        references.iter().any(|reference| {
            euclidean_distance(reference, candidate).is_some_and(|d| d <= tolerance)
        })
    }
}

/// `None` when the vectors differ in length.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let sum = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>();
    Some(sum.sqrt())
}
