use std::path::{Path, PathBuf};

use crate::shared::constants::{NON_TARGET_FOLDER, TARGET_FOLDER};
use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;

/// Where the untouched original is archived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchRoute {
    Target,
    NonTarget,
}

impl MatchRoute {
    pub fn from_match(any_target: bool) -> Self {
        if any_target {
            MatchRoute::Target
        } else {
            MatchRoute::NonTarget
        }
    }

    pub fn folder_name(self) -> &'static str {
        match self {
            MatchRoute::Target => TARGET_FOLDER,
            MatchRoute::NonTarget => NON_TARGET_FOLDER,
        }
    }
}

/// Writes the rendered result and archives the original.
pub trait ResultPersister: Send + Sync {
    /// Returns the path of the written rendered image.
    fn persist(
        &self,
        source: &Path,
        rendered: &Frame,
        route: MatchRoute,
    ) -> Result<PathBuf, AnalysisError>;
}
