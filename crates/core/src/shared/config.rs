use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::domain::non_max_suppression::DEFAULT_OVERLAP_THRESHOLD;
use crate::identity::domain::identity_gate::DEFAULT_MATCH_TOLERANCE;
use crate::rendering::domain::canvas_transform::DEFAULT_CANVAS_SIZE;
use crate::shared::constants::DEFAULT_TARGET_LABEL;
use crate::shared::error::AnalysisError;

/// Read-only settings for one pipeline instance.
///
/// Constructed once (usually from a JSON file) and shared by reference with
/// every stage; nothing mutates it after construction. Missing fields take
/// their defaults, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// YOLO face model. Resolved from the model cache (and downloaded) when unset.
    pub yolo_model_path: Option<PathBuf>,
    /// SeetaFace model. Resolved from the model cache (and downloaded) when unset.
    pub seeta_model_path: Option<PathBuf>,
    /// FairFace model. The FairFace predictor is unavailable when unset.
    pub fairface_model_path: Option<PathBuf>,
    /// ArcFace model. Resolved from the model cache (and downloaded) when unset.
    pub embedding_model_path: Option<PathBuf>,
    pub target_embeddings_path: PathBuf,
    /// Font used for labels and the summary header; must cover Hangul.
    pub font_path: PathBuf,
    pub results_folder: PathBuf,
    /// Maximum Euclidean distance between a face embedding and a target
    /// embedding for a match. Smaller is stricter.
    ///
    /// Embeddings are L2-normalised ArcFace vectors, so distances lie in
    /// `[0, 2]` and `d = sqrt(2 - 2 * cosine)`. The 0.3 default accepts only
    /// near-identical faces (cosine above ~0.955); around 1.0 (cosine 0.5) is
    /// a looser setting. Target embeddings must come from the same ArcFace
    /// model, otherwise distances are meaningless.
    pub match_tolerance: f64,
    pub nms_overlap_threshold: f64,
    pub canvas_size: u32,
    pub label_font_size: f32,
    pub yolo_confidence: f64,
    pub target_label: String,
    /// Per-image budget in batch runs; 0 disables the timeout.
    pub image_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            yolo_model_path: None,
            seeta_model_path: None,
            fairface_model_path: None,
            embedding_model_path: None,
            target_embeddings_path: PathBuf::from("target_embeddings.json"),
            font_path: PathBuf::from("fonts/NanumGothic.ttf"),
            results_folder: PathBuf::from("results"),
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            nms_overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            canvas_size: DEFAULT_CANVAS_SIZE,
            label_font_size: 15.0,
            yolo_confidence: 0.35,
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            image_timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    /// Loads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: AnalysisConfig = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.match_tolerance > 0.0) {
            return Err(AnalysisError::Config(format!(
                "match_tolerance must be positive, got {}",
                self.match_tolerance
            )));
        }
        if !(self.nms_overlap_threshold > 0.0 && self.nms_overlap_threshold <= 1.0) {
            return Err(AnalysisError::Config(format!(
                "nms_overlap_threshold must be in (0, 1], got {}",
                self.nms_overlap_threshold
            )));
        }
        if !(self.yolo_confidence > 0.0 && self.yolo_confidence <= 1.0) {
            return Err(AnalysisError::Config(format!(
                "yolo_confidence must be in (0, 1], got {}",
                self.yolo_confidence
            )));
        }
        if self.canvas_size == 0 {
            return Err(AnalysisError::Config("canvas_size must be > 0".into()));
        }
        if !(self.label_font_size > 0.0) {
            return Err(AnalysisError::Config(format!(
                "label_font_size must be positive, got {}",
                self.label_font_size
            )));
        }
        Ok(())
    }

    pub fn image_timeout(&self) -> Option<Duration> {
        (self.image_timeout_secs > 0).then(|| Duration::from_secs(self.image_timeout_secs))
    }
}
