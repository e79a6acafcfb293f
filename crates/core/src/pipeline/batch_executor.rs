use std::path::PathBuf;
use std::sync::Arc;

use crate::identity::domain::target_embeddings::TargetEmbeddingSet;
use crate::pipeline::analyze_image_use_case::AnalyzeImageUseCase;

/// Per-image outcome of a batch run, in input order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    /// `(input, rendered output)` pairs.
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// `(input, error message)` pairs.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Abstracts how a list of images is driven through the analysis pipeline.
///
/// One image failing (including a timeout) never stops the rest.
pub trait BatchExecutor: Send + Sync {
    fn run(
        &self,
        use_case: Arc<AnalyzeImageUseCase>,
        images: Vec<PathBuf>,
        targets: Arc<TargetEmbeddingSet>,
    ) -> BatchReport;
}
