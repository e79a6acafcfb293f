use crate::rendering::domain::face_renderer::Overlay;
use crate::shared::constants::BOXES_ONLY_COLOR;
use crate::shared::face_box::FaceBox;

/// Final per-face result for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePrediction {
    pub face: FaceBox,
    pub race: String,
    pub gender: String,
    pub box_color: [u8; 3],
    /// Either the target marker or the age bracket.
    pub label: String,
    /// True when `label` is the target marker.
    pub is_target: bool,
}

impl FacePrediction {
    pub fn x(&self) -> i32 {
        self.face.x1
    }

    pub fn y(&self) -> i32 {
        self.face.y1
    }

    pub fn width(&self) -> i32 {
        self.face.width()
    }

    pub fn height(&self) -> i32 {
        self.face.height()
    }
}

/// What the per-face stage produced for an image.
#[derive(Clone, Debug, PartialEq)]
pub enum FaceAnalysis {
    Predicted(Vec<FacePrediction>),
    /// No predictor configured: raw boxes, no attributes, no identity check.
    BoxesOnly(Vec<FaceBox>),
}

impl FaceAnalysis {
    pub fn any_target(&self) -> bool {
        match self {
            FaceAnalysis::Predicted(predictions) => predictions.iter().any(|p| p.is_target),
            FaceAnalysis::BoxesOnly(_) => false,
        }
    }

    pub fn overlays(&self) -> Vec<Overlay> {
        match self {
            FaceAnalysis::Predicted(predictions) => predictions
                .iter()
                .map(|p| Overlay {
                    face: p.face,
                    color: p.box_color,
                    label: Some(p.label.clone()),
                })
                .collect(),
            FaceAnalysis::BoxesOnly(faces) => faces
                .iter()
                .map(|&face| Overlay {
                    face,
                    color: BOXES_ONLY_COLOR,
                    label: None,
                })
                .collect(),
        }
    }
}
