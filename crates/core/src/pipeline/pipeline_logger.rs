use std::collections::HashMap;
use std::time::Instant;

/// Observer for the production loop.
///
/// The loop reports per-stage timings and metrics here instead of logging
/// directly, so binaries choose the output and tests can stay silent.
pub trait PipelineLogger: Send {
    /// Called once per produced frame with the running count.
    fn progress(&mut self, produced: usize);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time metric (buffer depth, face count).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-production report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _produced: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and maximum of one stage or metric.
///
/// Samples are folded in as they arrive; nothing per-frame is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl RunningStat {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates stage timings and metrics and writes them through `log`.
///
/// A progress line is logged every `throttle_frames` frames; the summary
/// is logged when production stops.
pub struct LogPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    start_time: Instant,
    produced: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            produced: 0,
        }
    }

    /// The formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.produced;
        let mut lines = vec![format!(
            "Production summary ({frames} frames, {:.1}s):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stat = &self.timings[stage];
            let total_ms = stat.sum;
            let avg_ms = stat.mean();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let stat = &self.metrics[name];
            lines.push(format!(
                "  {name}: avg {:.1}, max {:.0}",
                stat.mean(),
                stat.max
            ));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, produced: usize) {
        self.produced = produced;
        if produced % self.throttle_frames == 0 {
            log::debug!("Produced {produced} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn record(stats: &mut HashMap<String, RunningStat>, key: &str, value: f64) {
    match stats.get_mut(key) {
        Some(stat) => stat.record(value),
        None => {
            let mut stat = RunningStat::default();
            stat.record(value);
            stats.insert(key.to_string(), stat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing("extract", 5.0);
        logger.metric("buffer_depth", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("extract", 20.0);
        logger.timing("extract", 30.0);
        logger.timing("annotate", 5.0);

        let extract = logger.timings_for("extract").unwrap();
        assert_eq!(extract.count, 2);
        assert_relative_eq!(extract.sum, 50.0);
        assert_relative_eq!(extract.max, 30.0);
        assert_relative_eq!(extract.mean(), 25.0);
        assert_eq!(logger.timings_for("annotate").unwrap().count, 1);
        assert!(logger.timings_for("read").is_none());
    }

    #[test]
    fn test_long_run_keeps_one_aggregate_per_key() {
        let mut logger = LogPipelineLogger::new(300);
        for frame in 1..=100_000 {
            logger.timing("read", 1.0);
            logger.timing("extract", 2.0);
            logger.timing("publish", 0.5);
            logger.timing("annotate", 0.25);
            logger.metric("faces", 1.0);
            logger.metric("buffer_depth", (frame % 6) as f64);
            logger.progress(frame);
        }

        assert_eq!(logger.timings.len(), 4);
        assert_eq!(logger.metrics.len(), 2);
        assert_eq!(logger.timings_for("read").unwrap().count, 100_000);
        let depth = logger.metrics_for("buffer_depth").unwrap();
        assert_eq!(depth.count, 100_000);
        assert_relative_eq!(depth.max, 5.0);
    }

    #[test]
    fn test_running_stat_tracks_negative_max() {
        let mut stat = RunningStat::default();
        stat.record(-3.0);
        stat.record(-1.0);
        assert_relative_eq!(stat.max, -1.0);
        assert_relative_eq!(stat.mean(), -2.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(10);
        logger.timing("extract", 20.0);
        logger.timing("publish", 1.0);
        logger.metric("buffer_depth", 3.0);
        logger.metric("buffer_depth", 5.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Production summary (10 frames"));
        assert!(summary.contains("extract"));
        assert!(summary.contains("publish"));
        assert!(summary.contains("buffer_depth: avg 4.0, max 5"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_empty_stat_mean_is_zero() {
        assert_relative_eq!(RunningStat::default().mean(), 0.0);
    }

    #[test]
    fn test_zero_throttle_is_raised() {
        let mut logger = LogPipelineLogger::new(0);
        logger.progress(7);
        assert_eq!(logger.throttle_frames, 1);
        assert_eq!(logger.produced, 7);
    }
}
