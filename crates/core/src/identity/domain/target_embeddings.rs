use std::fs;
use std::path::Path;

use crate::shared::error::AnalysisError;

/// Reference embeddings for the identity of interest.
///
/// Loaded once at startup and shared read-only across images and threads.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetEmbeddingSet {
    embeddings: Vec<Vec<f32>>,
}

impl TargetEmbeddingSet {
    /// Builds a set from in-memory vectors. The set must be non-empty and
    /// every vector must have the same length.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Result<Self, AnalysisError> {
        let Some(first) = embeddings.first() else {
            return Err(AnalysisError::Config(
                "target embedding set is empty".into(),
            ));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(AnalysisError::Config(
                "target embeddings must not be empty vectors".into(),
            ));
        }
        if let Some((i, bad)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != dim) {
            return Err(AnalysisError::Config(format!(
                "target embedding {i} has length {}, expected {dim}",
                bad.len()
            )));
        }
        Ok(Self { embeddings })
    }

    /// Reads a JSON array of float arrays.
    ///
    /// The vectors must be produced by the same embedding model the pipeline
    /// encodes faces with.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!(
                "cannot read target embeddings {}: {e}",
                path.display()
            ))
        })?;
        let embeddings: Vec<Vec<f32>> = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::Config(format!(
                "cannot parse target embeddings {}: {e}",
                path.display()
            ))
        })?;
        let set = Self::new(embeddings)?;
        log::info!(
            "Loaded {} target embeddings ({}-d) from {}",
            set.len(),
            set.dimension(),
            path.display()
        );
        Ok(set)
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.first().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("targets.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]");

        let set = TargetEmbeddingSet::load(&path).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.dimension(), 3);
        assert_eq!(set.embeddings()[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = TargetEmbeddingSet::load(Path::new("/nonexistent/targets.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_load_malformed_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"not": "an array"}"#);
        assert!(matches!(
            TargetEmbeddingSet::load(&path),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[]");
        assert!(TargetEmbeddingSet::load(&path).is_err());
    }

    #[test]
    fn test_ragged_set_is_rejected() {
        let err = TargetEmbeddingSet::new(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("embedding 1"));
    }
}
