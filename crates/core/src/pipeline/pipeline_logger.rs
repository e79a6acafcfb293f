use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Named steps of the per-image pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Load,
    Detect,
    Analyze,
    Render,
    Persist,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Detect => "detect",
            Stage::Analyze => "analyze",
            Stage::Render => "render",
            Stage::Persist => "persist",
        }
    }
}

/// Cross-cutting observer for pipeline events.
///
/// Shared between batch workers, so every method takes `&self`.
pub trait PipelineLogger: Send + Sync {
    /// Report image-level progress across a batch.
    fn progress(&self, current: usize, total: usize);

    /// Record how long a stage took for one image.
    fn timing(&self, stage: Stage, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces detected, faces dropped).
    fn metric(&self, name: &str, value: f64);

    /// Emit an end-of-batch summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&self, _current: usize, _total: usize) {}
    fn timing(&self, _stage: Stage, _duration_ms: f64) {}
    fn metric(&self, _name: &str, _value: f64) {}
}

#[derive(Default)]
struct Recorded {
    timings: HashMap<Stage, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    total_images: usize,
}

/// Aggregates stage timings and metrics, reporting them via `log` at the end.
pub struct StageTimingLogger {
    recorded: Mutex<Recorded>,
    start_time: Instant,
}

impl StageTimingLogger {
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(Recorded::default()),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        let recorded = self.recorded.lock().ok()?;
        if recorded.timings.is_empty() && recorded.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let images = recorded.total_images;
        let mut lines = vec![format!(
            "Pipeline summary ({images} images, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = recorded.timings.keys().copied().collect();
        stages.sort();
        for stage in stages {
            let durations = &recorded.timings[&stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len() as f64;
            lines.push(format!(
                "  {:8}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms  ({} images)",
                stage.as_str(),
                durations.len()
            ));
        }

        let mut names: Vec<_> = recorded.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &recorded.metrics[name];
            let total: f64 = values.iter().sum();
            lines.push(format!(
                "  {name}: total {total:.0}, avg {:.1}",
                total / values.len() as f64
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: Stage) -> Vec<f64> {
        self.recorded
            .lock()
            .map(|r| r.timings.get(&stage).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn metrics_for(&self, name: &str) -> Vec<f64> {
        self.recorded
            .lock()
            .map(|r| r.metrics.get(name).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl Default for StageTimingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StageTimingLogger {
    fn progress(&self, current: usize, total: usize) {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.total_images = total;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} images ({pct:.1}%)");
        }
    }

    fn timing(&self, stage: Stage, duration_ms: f64) {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.timings.entry(stage).or_default().push(duration_ms);
        }
    }

    fn metric(&self, name: &str, value: f64) {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded
                .metrics
                .entry(name.to_string())
                .or_default()
                .push(value);
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing(Stage::Detect, 5.0);
        logger.metric("faces", 3.0);
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let logger = StageTimingLogger::new();
        logger.timing(Stage::Detect, 20.0);
        logger.timing(Stage::Detect, 30.0);
        logger.timing(Stage::Render, 5.0);

        assert_eq!(logger.timings_for(Stage::Detect), vec![20.0, 30.0]);
        assert_eq!(logger.timings_for(Stage::Render), vec![5.0]);
        assert!(logger.timings_for(Stage::Persist).is_empty());
    }

    #[test]
    fn test_metric_records_values() {
        let logger = StageTimingLogger::new();
        logger.metric("faces_detected", 3.0);
        logger.metric("faces_detected", 4.0);
        assert_eq!(logger.metrics_for("faces_detected"), vec![3.0, 4.0]);
    }

    #[test]
    fn test_summary_lists_stages_in_pipeline_order() {
        let logger = StageTimingLogger::new();
        logger.progress(2, 2);
        logger.timing(Stage::Persist, 1.0);
        logger.timing(Stage::Load, 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 images"));
        let load = summary.find("load").unwrap();
        let persist = summary.find("persist").unwrap();
        assert!(load < persist);
    }

    #[test]
    fn test_summary_includes_metric_totals() {
        let logger = StageTimingLogger::new();
        logger.metric("faces_dropped", 1.0);
        logger.metric("faces_dropped", 2.0);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("faces_dropped: total 3, avg 1.5"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StageTimingLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_concurrent_recording() {
        let logger = Arc::new(StageTimingLogger::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        logger.timing(Stage::Analyze, 1.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(logger.timings_for(Stage::Analyze).len(), 100);
    }
}
