use std::fs;
use std::path::{Path, PathBuf};

use crate::persistence::domain::result_persister::{MatchRoute, ResultPersister};
use crate::persistence::infrastructure::exif_stamp::{self, StampFormat};
use crate::shared::error::{AnalysisError, BoxError};
use crate::shared::frame::Frame;

/// Writes results under one folder:
///
/// - `<results>/<name>`: the rendered image, encoded per its extension
/// - `<results>/<route folder>/<name>`: the original, with synthetic EXIF
pub struct FileResultPersister {
    results_folder: PathBuf,
}

impl FileResultPersister {
    pub fn new(results_folder: impl Into<PathBuf>) -> Self {
        Self {
            results_folder: results_folder.into(),
        }
    }

    fn write_rendered(&self, name: &Path, rendered: &Frame) -> Result<PathBuf, BoxError> {
        fs::create_dir_all(&self.results_folder)?;
        let output_path = self.results_folder.join(name);
        rendered.to_rgb_image().save(&output_path)?;
        Ok(output_path)
    }

    fn archive_original(&self, source: &Path, name: &Path, route: MatchRoute) -> Result<PathBuf, BoxError> {
        let folder = self.results_folder.join(route.folder_name());
        fs::create_dir_all(&folder)?;
        let archived = folder.join(name);
        fs::copy(source, &archived)?;

        match StampFormat::from_path(&archived) {
            Some(format) => {
                if let Err(e) = stamp_in_place(&archived, format) {
                    log::warn!("Could not add metadata to {}: {e}", archived.display());
                }
            }
            None => log::warn!(
                "Metadata not supported for {}, copied without it",
                archived.display()
            ),
        }
        Ok(archived)
    }
}

fn stamp_in_place(path: &Path, format: StampFormat) -> Result<(), BoxError> {
    let bytes = fs::read(path)?;
    let stamped = exif_stamp::stamp(&bytes, format)?;
    fs::write(path, stamped)?;
    Ok(())
}

impl ResultPersister for FileResultPersister {
    fn persist(
        &self,
        source: &Path,
        rendered: &Frame,
        route: MatchRoute,
    ) -> Result<PathBuf, AnalysisError> {
        let persistence_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| AnalysisError::Persistence { path, source }
        };
        let name = source.file_name().map(Path::new).ok_or_else(|| {
            AnalysisError::Persistence {
                path: source.to_path_buf(),
                source: "source path has no file name".into(),
            }
        })?;

        let output_path = self
            .write_rendered(name, rendered)
            .map_err(persistence_err(&self.results_folder.join(name)))?;
        log::info!("Saved analysis result to {}", output_path.display());

        let archived = self
            .archive_original(source, name, route)
            .map_err(persistence_err(source))?;
        log::info!("Archived original to {}", archived.display());

        Ok(output_path)
    }
}
