use crate::identity::domain::face_encoder::FaceEncoder;
use crate::identity::domain::target_embeddings::TargetEmbeddingSet;
use crate::shared::constants::MALE;
use crate::shared::error::AnalysisError;
use crate::shared::face_box::{FaceBox, FaceLocation};
use crate::shared::frame::Frame;

/// Euclidean distance on L2-normalised embeddings; see `AnalysisConfig::match_tolerance`.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.3;

/// Outcome of matching one face against the target set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityVerdict {
    /// The region could not be embedded; the face is dropped.
    Unencodable,
    Checked { is_match: bool },
}

/// Embeds a face and decides whether it is the target identity.
pub struct IdentityGate {
    encoder: Box<dyn FaceEncoder>,
    tolerance: f64,
}

impl IdentityGate {
    pub fn new(encoder: Box<dyn FaceEncoder>, tolerance: f64) -> Self {
        Self { encoder, tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `face` is in detector `(x1, y1, x2, y2)` form and is handed to the
    /// encoder as `(top, right, bottom, left)`.
    ///
    /// An empty embedding counts as unencodable. One whose length differs from
    /// the target set is an encoding error.
    pub fn evaluate(
        &self,
        image: &Frame,
        face: FaceBox,
        targets: &TargetEmbeddingSet,
    ) -> Result<IdentityVerdict, AnalysisError> {
        let embedding = self
            .encoder
            .encode(image, FaceLocation::from(face))
            .map_err(AnalysisError::Encoding)?;

        let embedding = match embedding {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(IdentityVerdict::Unencodable),
        };
        if embedding.len() != targets.dimension() {
            return Err(AnalysisError::Encoding(
                format!(
                    "embedding has {} dimensions, target set has {}",
                    embedding.len(),
                    targets.dimension()
                )
                .into(),
            ));
        }
        let is_match = self
            .encoder
            .compare(targets.embeddings(), &embedding, self.tolerance);
        Ok(IdentityVerdict::Checked { is_match })
    }
}

/// Picks the face label: the target marker only for a matched face predicted
/// male, otherwise the age bracket.
pub fn resolve_label<'a>(is_match: bool, gender: &str, age: &'a str, target_label: &'a str) -> &'a str {
    if is_match && gender == MALE {
        target_label
    } else {
        age
    }
}
