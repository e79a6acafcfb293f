use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("configured model file does not exist: {0}")]
    Missing(PathBuf),
    #[error("no user cache directory on this platform")]
    NoCacheDir,
    #[error("could not fetch {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Called with `(bytes_so_far, content_length)`; the length is 0 when unknown.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Returns a usable model path: the configured one if given (it must exist),
/// else `name` inside [`model_cache_dir`], fetched from `url` on first use.
pub fn resolve(
    configured: Option<&Path>,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ModelResolveError::Missing(path.to_path_buf())),
        None => fetch_into(&model_cache_dir()?, name, url, progress),
    }
}

/// `<user cache>/FaceWatch/models`; application data on macOS.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    let base = if cfg!(target_os = "macos") {
        dirs::data_dir()
    } else {
        dirs::cache_dir()
    };
    base.map(|dir| dir.join("FaceWatch/models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn fetch_into(
    dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let target = dir.join(name);
    if target.is_file() {
        log::debug!("Using cached model {}", target.display());
        return Ok(target);
    }
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    log::info!("Downloading {name} from {url}");
    let partial = target.with_extension("part");
    if let Err(e) = stream_to(url, &partial, progress) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, &target).map_err(io_error(&target))?;
    Ok(target)
}

fn stream_to(url: &str, path: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let mut sink = Counting {
        inner: File::create(path).map_err(io_error(path))?,
        written: 0,
        total: response.content_length().unwrap_or(0),
        progress,
    };
    io::copy(&mut response, &mut sink).map_err(io_error(path))?;
    sink.flush().map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ModelResolveError {
    let path = path.to_path_buf();
    move |source| ModelResolveError::Io { path, source }
}

/// Writer that reports each chunk to the progress callback.
struct Counting<W> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(cb) = &self.progress {
            cb(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const UNREACHABLE: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_configured_path_wins() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("custom.onnx");
        fs::write(&model, b"weights").unwrap();

        let resolved = resolve(Some(&model), "other.onnx", UNREACHABLE, None).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_missing_configured_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone.onnx");

        let err = resolve(Some(&missing), "gone.onnx", UNREACHABLE, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == missing));
    }

    #[test]
    fn test_cached_file_is_reused_without_download() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("model.onnx"), b"cached").unwrap();

        let resolved = fetch_into(tmp.path(), "model.onnx", UNREACHABLE, None).unwrap();
        assert_eq!(fs::read(resolved).unwrap(), b"cached");
    }

    #[test]
    fn test_cache_miss_with_bad_url_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("models");

        let err = fetch_into(&cache, "model.onnx", UNREACHABLE, None).unwrap_err();

        assert!(matches!(err, ModelResolveError::Download { .. }));
        assert!(cache.is_dir());
        assert!(!cache.join("model.onnx").exists());
        assert!(!cache.join("model.part").exists());
    }

    #[test]
    fn test_counting_writer_reports_running_total() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut writer = Counting {
            inner: Vec::new(),
            written: 0,
            total: 5,
            progress: Some(Box::new(move |done, total| sink.lock().unwrap().push((done, total)))),
        };

        writer.write_all(b"abc").unwrap();
        writer.write_all(b"de").unwrap();

        assert_eq!(writer.inner, b"abcde");
        assert_eq!(*seen.lock().unwrap(), vec![(3, 5), (5, 5)]);
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with("FaceWatch/models"));
    }
}
