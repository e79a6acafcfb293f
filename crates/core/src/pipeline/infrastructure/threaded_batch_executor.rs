use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::identity::domain::target_embeddings::TargetEmbeddingSet;
use crate::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use crate::pipeline::batch_executor::{BatchExecutor, BatchReport};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::error::AnalysisError;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type Job = (usize, PathBuf);
type Outcome = (usize, PathBuf, Result<PathBuf, AnalysisError>);

/// Runs images on a fixed pool of worker threads.
///
/// Layout: `feeder → [worker × N] → main [collect/report]`
///
/// Each image executes on its own short-lived thread so a worker can stop
/// waiting once the per-image timeout expires. A timed-out image is reported
/// as failed and its thread is cancelled before it can render or persist.
pub struct ThreadedBatchExecutor {
    workers: usize,
    timeout: Option<Duration>,
    channel_capacity: usize,
    logger: Arc<dyn PipelineLogger>,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize, timeout: Option<Duration>) -> Self {
        Self {
            workers: workers.max(1),
            timeout,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            logger: Arc::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn run(
        &self,
        use_case: Arc<AnalyzeImageUseCase>,
        images: Vec<PathBuf>,
        targets: Arc<TargetEmbeddingSet>,
    ) -> BatchReport {
        let total = images.len();
        if total == 0 {
            return BatchReport::default();
        }
        log::info!("Processing {total} images on {} workers", self.workers);

        let cap = self.channel_capacity;
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(cap);
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<Outcome>(cap);

        let feeder = spawn_feeder(images, job_tx);
        let workers: Vec<_> = (0..self.workers)
            .map(|_| {
                spawn_worker(
                    use_case.clone(),
                    targets.clone(),
                    job_rx.clone(),
                    outcome_tx.clone(),
                    self.timeout,
                )
            })
            .collect();
        drop(job_rx);
        drop(outcome_tx);

        let mut outcomes = Vec::with_capacity(total);
        for outcome in outcome_rx {
            outcomes.push(outcome);
            self.logger.progress(outcomes.len(), total);
        }

        if feeder.join().is_err() {
            log::error!("Batch feeder thread panicked");
        }
        for handle in workers {
            if handle.join().is_err() {
                log::error!("Batch worker thread panicked");
            }
        }

        build_report(outcomes)
    }
}

fn spawn_feeder(images: Vec<PathBuf>, job_tx: Sender<Job>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for job in images.into_iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
    })
}

fn spawn_worker(
    use_case: Arc<AnalyzeImageUseCase>,
    targets: Arc<TargetEmbeddingSet>,
    job_rx: Receiver<Job>,
    outcome_tx: Sender<Outcome>,
    timeout: Option<Duration>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, path) in job_rx {
            let result = run_one(&use_case, &targets, path.clone(), timeout);
            if outcome_tx.send((index, path, result)).is_err() {
                break;
            }
        }
    })
}

/// Runs one image on its own thread, giving up after `timeout`.
fn run_one(
    use_case: &Arc<AnalyzeImageUseCase>,
    targets: &Arc<TargetEmbeddingSet>,
    path: PathBuf,
    timeout: Option<Duration>,
) -> Result<PathBuf, AnalysisError> {
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let cancel = Arc::new(AtomicBool::new(false));
    let use_case = use_case.clone();
    let targets = targets.clone();
    let image = path.clone();
    let thread_cancel = cancel.clone();
    std::thread::spawn(move || {
        // The receiver is gone once the image has timed out.
        let _ = done_tx.send(use_case.process_image_cancellable(&image, &targets, &thread_cancel));
    });

    let Some(limit) = timeout else {
        return done_rx
            .recv()
            .unwrap_or_else(|_| Err(panicked(&path)));
    };
    match done_rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Release);
            log::error!("Timed out after {limit:?}: {}", path.display());
            Err(AnalysisError::Timeout(limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err(panicked(&path)),
    }
}

fn panicked(path: &Path) -> AnalysisError {
    log::error!("Processing thread panicked: {}", path.display());
    AnalysisError::Panicked(path.to_path_buf())
}

fn build_report(mut outcomes: Vec<Outcome>) -> BatchReport {
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut report = BatchReport::default();
    for (_, input, result) in outcomes {
        match result {
            Ok(output) => report.succeeded.push((input, output)),
            Err(e) => report.failed.push((input, e.to_string())),
        }
    }
    log::info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}
