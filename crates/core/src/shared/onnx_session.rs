use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::shared::error::BoxError;

/// Opens an ONNX model with the platform's accelerated provider, if any.
///
/// Every model in the pipeline is driven one image at a time from worker
/// threads, so inter-op parallelism is pinned to one thread.
pub fn load_session(model_path: &Path) -> Result<Session, BoxError> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Fails when a model run returned no output tensors.
pub fn ensure_outputs(count: usize, model: &str) -> Result<(), BoxError> {
    if count == 0 {
        return Err(format!("{model} model produced no outputs").into());
    }
    Ok(())
}

/// CoreML on macOS, DirectML on Windows, plain CPU elsewhere.
fn execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
