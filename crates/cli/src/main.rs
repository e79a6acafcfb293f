use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use facewatch_core::detection::domain::detection_aggregator::DetectionAggregator;
use facewatch_core::detection::domain::face_detector::FaceDetector;
use facewatch_core::detection::infrastructure::model_resolver::{self, ProgressFn};
use facewatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facewatch_core::detection::infrastructure::seeta_face_detector::SeetaFaceDetector;
use facewatch_core::identity::domain::identity_gate::IdentityGate;
use facewatch_core::identity::domain::target_embeddings::TargetEmbeddingSet;
use facewatch_core::identity::infrastructure::onnx_arcface_encoder::OnnxArcFaceEncoder;
use facewatch_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use facewatch_core::persistence::infrastructure::file_result_persister::FileResultPersister;
use facewatch_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use facewatch_core::pipeline::batch_executor::BatchExecutor;
use facewatch_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use facewatch_core::pipeline::pipeline_logger::{PipelineLogger, StageTimingLogger};
use facewatch_core::prediction::domain::attribute_predictor::AttributePredictor;
use facewatch_core::prediction::domain::prediction_aggregator::PredictionAggregator;
use facewatch_core::prediction::infrastructure::onnx_fairface_predictor::OnnxFairFacePredictor;
use facewatch_core::rendering::infrastructure::overlay_renderer::OverlayRenderer;
use facewatch_core::shared::config::AnalysisConfig;
use facewatch_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, IMAGE_EXTENSIONS, SEETA_MODEL_NAME,
    SEETA_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DetectorKind {
    Yolo,
    Seeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PredictorKind {
    Fairface,
}

/// Ensemble face detection, attribute prediction and target identification
/// for batches of images.
#[derive(Parser, Debug)]
#[command(name = "facewatch")]
struct Cli {
    /// Image files, or directories whose images are processed (non-recursive).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detectors to run, in order (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',', num_args = 0.., default_values_t = [DetectorKind::Yolo, DetectorKind::Seeta])]
    detectors: Vec<DetectorKind>,

    /// Attribute predictors to run, in order. Pass the flag with no value
    /// to only draw boxes.
    #[arg(long, value_enum, value_delimiter = ',', num_args = 0.., default_values_t = [PredictorKind::Fairface])]
    predictors: Vec<PredictorKind>,

    /// Number of images processed in parallel.
    #[arg(long, default_value_t = default_jobs())]
    jobs: usize,

    /// Per-image timeout in seconds (0 disables). Overrides the config file.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = load_config(&cli)?;

    let images = collect_images(&cli.inputs)?;
    if images.is_empty() {
        log::warn!("No images found in the given inputs");
        return Ok(());
    }

    let targets = Arc::new(TargetEmbeddingSet::load(&config.target_embeddings_path)?);
    log::info!(
        "Loaded {} target embeddings (dimension {})",
        targets.len(),
        targets.dimension()
    );

    let logger = Arc::new(StageTimingLogger::new());
    let use_case = Arc::new(build_use_case(&cli, &config, logger.clone())?);
    let executor =
        ThreadedBatchExecutor::new(cli.jobs, config.image_timeout()).with_logger(logger.clone());

    let report = executor.run(use_case, images, targets);
    logger.summary();

    for (input, error) in &report.failed {
        log::warn!("Failed: {}: {error}", input.display());
    }
    log::info!(
        "{} of {} images written to {}",
        report.succeeded.len(),
        report.total(),
        config.results_folder.display()
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(secs) = cli.timeout_secs {
        config.image_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

fn build_use_case(
    cli: &Cli,
    config: &AnalysisConfig,
    logger: Arc<dyn PipelineLogger>,
) -> Result<AnalyzeImageUseCase, Box<dyn std::error::Error + Send + Sync>> {
    let detectors = cli
        .detectors
        .iter()
        .map(|&kind| build_detector(kind, config))
        .collect::<Result<Vec<_>, _>>()?;
    let detection =
        DetectionAggregator::new(detectors).with_overlap_threshold(config.nms_overlap_threshold);
    log::info!("Detectors: {}", detection.detector_names().join(", "));

    let prediction = if cli.predictors.is_empty() {
        log::info!("No predictors selected: drawing boxes only");
        None
    } else {
        let predictors = cli
            .predictors
            .iter()
            .map(|&kind| build_predictor(kind, config))
            .collect::<Result<Vec<_>, _>>()?;
        let prediction = PredictionAggregator::new(predictors);
        log::info!("Predictors: {}", prediction.predictor_names().join(", "));
        Some(prediction)
    };

    let embedding_model = model_resolver::resolve(
        config.embedding_model_path.as_deref(),
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        Some(download_progress(EMBEDDING_MODEL_NAME)),
    )?;
    let identity = IdentityGate::new(
        Box::new(OnnxArcFaceEncoder::new(&embedding_model)?),
        config.match_tolerance,
    );

    let renderer = OverlayRenderer::new(&config.font_path, config.canvas_size, config.label_font_size)?;

    Ok(AnalyzeImageUseCase::new(
        Box::new(ImageFileReader),
        detection,
        prediction,
        identity,
        Box::new(renderer),
        Box::new(FileResultPersister::new(config.results_folder.clone())),
    )
    .with_target_label(config.target_label.clone())
    .with_logger(logger))
}

fn build_detector(
    kind: DetectorKind,
    config: &AnalysisConfig,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error + Send + Sync>> {
    match kind {
        DetectorKind::Yolo => {
            let path = model_resolver::resolve(
                config.yolo_model_path.as_deref(),
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                Some(download_progress(YOLO_MODEL_NAME)),
            )?;
            Ok(Box::new(OnnxYoloDetector::new(&path, config.yolo_confidence)?))
        }
        DetectorKind::Seeta => {
            let path = model_resolver::resolve(
                config.seeta_model_path.as_deref(),
                SEETA_MODEL_NAME,
                SEETA_MODEL_URL,
                Some(download_progress(SEETA_MODEL_NAME)),
            )?;
            Ok(Box::new(SeetaFaceDetector::new(&path)?))
        }
    }
}

fn build_predictor(
    kind: PredictorKind,
    config: &AnalysisConfig,
) -> Result<Box<dyn AttributePredictor>, Box<dyn std::error::Error + Send + Sync>> {
    match kind {
        PredictorKind::Fairface => {
            let path = config
                .fairface_model_path
                .as_deref()
                .ok_or("the fairface predictor needs fairface_model_path in the config file")?;
            Ok(Box::new(OnnxFairFacePredictor::new(path)?))
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if cli.detectors.is_empty() {
        return Err("At least one detector must be selected".into());
    }
    if cli.jobs == 0 {
        return Err("Jobs must be at least 1".into());
    }
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    Ok(())
}

/// Expands directories into their image files, sorted by name. Explicit
/// files are kept as given.
fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_image(path))
                .collect();
            found.sort();
            log::info!("{}: {} images", input.display(), found.len());
            images.extend(found);
        } else {
            images.push(input.clone());
        }
    }
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn download_progress(name: &'static str) -> ProgressFn {
    Box::new(move |downloaded, total| {
        if total > 0 {
            let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
            eprint!("\rDownloading {name}... {pct}%");
            if downloaded >= total {
                eprintln!();
            }
        } else {
            eprint!("\rDownloading {name}... {downloaded} bytes");
        }
    })
}
