//! Evaluation session: configuration, loading, validation and per-metric runs.
//!
//! [`EvalSession`] is the entry point of the library. It loads the input and
//! output directories once, validates their key correspondence, then runs
//! every selected metric over the pair and aggregates the results into one
//! [`EvalReport`] per metric.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{ImageSet, correspondence, ensure_dir};
use crate::enhance::{ClaheParams, EnhanceSummary, enhance_directory};
use crate::error::{Error, Result};
use crate::eval::batch::{BatchEvaluator, BatchOptions, KeyOutcome};
use crate::eval::report::EvalReport;
use crate::metrics::{MetricAdapter, MetricConfig, MetricInfo, MetricKind, ssim};

/// Configuration for an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Directory of original ("before") images.
    pub input_dir: PathBuf,

    /// Directory of enhanced ("after") images.
    pub output_dir: PathBuf,

    /// Metrics to run, in report order.
    pub metrics: Vec<MetricKind>,

    /// SSIM window side length.
    pub ssim_window_size: usize,

    /// Parameters of [`EvalSession::enhance`], which writes `output_dir`.
    pub clahe: ClaheParams,

    /// Score keys on the rayon thread pool.
    pub parallel: bool,

    /// Abort on the first failing key.
    pub strict: bool,

    /// Also score the input set with no-reference metrics.
    pub score_input_set: bool,

    /// Directory for JSON/CSV reports.
    pub report_dir: Option<PathBuf>,
}

impl EvalConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }

    /// Metric configuration derived from this config.
    #[must_use]
    pub fn metric_config(&self) -> MetricConfig {
        MetricConfig {
            ssim_window_size: self.ssim_window_size,
        }
    }

    /// Batch switches derived from this config.
    #[must_use]
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            parallel: self.parallel,
            strict: self.strict,
            score_input_set: self.score_input_set,
        }
    }
}

/// Builder for [`EvalConfig`].
#[derive(Debug, Default)]
pub struct EvalConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    metrics: Vec<MetricKind>,
    ssim_window_size: Option<usize>,
    clahe: Option<ClaheParams>,
    parallel: bool,
    strict: bool,
    score_input_set: bool,
    report_dir: Option<PathBuf>,
}

impl EvalConfigBuilder {
    /// Set the input ("before") directory.
    #[must_use]
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Set the output ("after") directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Add one metric. Without any, all built-in metrics run.
    #[must_use]
    pub fn metric(mut self, kind: MetricKind) -> Self {
        self.metrics.push(kind);
        self
    }

    /// Set the metric selection.
    #[must_use]
    pub fn metrics(mut self, kinds: impl IntoIterator<Item = MetricKind>) -> Self {
        self.metrics = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn ssim_window_size(mut self, size: usize) -> Self {
        self.ssim_window_size = Some(size);
        self
    }

    #[must_use]
    pub fn clahe(mut self, params: ClaheParams) -> Self {
        self.clahe = Some(params);
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn score_input_set(mut self, enabled: bool) -> Self {
        self.score_input_set = enabled;
        self
    }

    /// Set the report output directory.
    #[must_use]
    pub fn report_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(path.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EvalConfig> {
        let input_dir = self
            .input_dir
            .ok_or_else(|| Error::Configuration("input_dir is required".to_string()))?;
        let output_dir = self
            .output_dir
            .ok_or_else(|| Error::Configuration("output_dir is required".to_string()))?;

        let mut metrics = Vec::new();
        for kind in self.metrics {
            if !metrics.contains(&kind) {
                metrics.push(kind);
            }
        }
        if metrics.is_empty() {
            metrics = MetricKind::ALL.to_vec();
        }

        let ssim_window_size = self.ssim_window_size.unwrap_or(ssim::DEFAULT_WINDOW_SIZE);
        ssim::validate_window_size(ssim_window_size)?;

        let clahe = self.clahe.unwrap_or_default();
        clahe.validate()?;

        Ok(EvalConfig {
            input_dir,
            output_dir,
            metrics,
            ssim_window_size,
            clahe,
            parallel: self.parallel,
            strict: self.strict,
            score_input_set: self.score_input_set,
            report_dir: self.report_dir,
        })
    }
}

/// Progress notifications emitted by [`EvalSession::run_with`].
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    /// One key of the current metric finished.
    Key {
        metric: &'a MetricInfo,
        outcome: KeyOutcome<'a>,
    },
    /// A metric finished; its report is complete.
    Finished(&'a EvalReport),
}

/// Evaluation session over one input/output directory pair.
///
/// # Example
///
/// ```rust,ignore
/// use lowlight_eval::{EvalConfig, EvalSession, MetricKind};
///
/// let config = EvalConfig::builder()
///     .input_dir("./low")
///     .output_dir("./enhanced")
///     .metric(MetricKind::Psnr)
///     .build()?;
///
/// for report in EvalSession::new(config).run()? {
///     print!("{}", report.render());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EvalSession {
    config: EvalConfig,
}

impl EvalSession {
    /// Create a new evaluation session.
    #[must_use]
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Load both directories and check that their keys correspond.
    ///
    /// Both directories must exist before either one is read.
    pub fn load(&self) -> Result<(ImageSet, ImageSet)> {
        ensure_dir(&self.config.input_dir)?;
        ensure_dir(&self.config.output_dir)?;

        let input = ImageSet::load(&self.config.input_dir)?;
        let output = ImageSet::load(&self.config.output_dir)?;
        correspondence::validate(&input.key_set(), &output.key_set())?;
        info!(keys = input.len(), "image sets correspond");
        Ok((input, output))
    }

    /// Enhance `input_dir` into `output_dir` with the configured CLAHE
    /// parameters.
    pub fn enhance(&self) -> Result<EnhanceSummary> {
        enhance_directory(
            &self.config.input_dir,
            &self.config.output_dir,
            &self.config.clahe,
            self.config.parallel,
        )
    }

    /// Run every configured metric.
    pub fn run(&self) -> Result<Vec<EvalReport>> {
        self.run_with(|_| {})
    }

    /// Run every configured metric, reporting progress to `observer`.
    ///
    /// Reports are written to `report_dir` as each metric finishes, when one
    /// is configured.
    pub fn run_with(
        &self,
        mut observer: impl FnMut(SessionEvent<'_>),
    ) -> Result<Vec<EvalReport>> {
        let (input, output) = self.load()?;

        let mut reports = Vec::with_capacity(self.config.metrics.len());
        for &kind in &self.config.metrics {
            let report = self.evaluate_metric(kind, &input, &output, &mut observer)?;
            if let Some(dir) = &self.config.report_dir {
                let (json, csv) = report.write_to(dir)?;
                info!(json = %json.display(), csv = %csv.display(), "wrote report");
            }
            observer(SessionEvent::Finished(&report));
            reports.push(report);
        }
        Ok(reports)
    }

    /// Score one metric over an already loaded pair of sets.
    pub fn evaluate_metric(
        &self,
        kind: MetricKind,
        input: &ImageSet,
        output: &ImageSet,
        observer: &mut impl FnMut(SessionEvent<'_>),
    ) -> Result<EvalReport> {
        let adapter = MetricAdapter::new(kind, &self.config.metric_config())?;
        let metric = adapter.info();
        info!(metric = %metric.name, keys = input.len(), "evaluating metric");

        let start = Instant::now();
        let evaluator = BatchEvaluator::new(&adapter, self.config.batch_options());
        let evaluation = evaluator.evaluate_with(input, output, |outcome| {
            observer(SessionEvent::Key {
                metric: &metric,
                outcome,
            });
        })?;

        let mut report = EvalReport::new(metric.clone(), evaluation, self.config.clone());
        report.elapsed = start.elapsed();
        report.skipped = input.skipped().iter().chain(output.skipped()).cloned().collect();
        report.collisions = input
            .collisions()
            .iter()
            .chain(output.collisions())
            .cloned()
            .collect();

        info!(
            metric = %metric.name,
            scored = report.records.len(),
            failed = report.failures.len(),
            "metric finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::report::RunStatus;
    use crate::metrics::psnr::PSNR_MAX;
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, width: u32, height: u32, seed: u32) {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 11 + y * 5 + seed * 17) % 180) as u8 + 20;
            Rgb([v, v.saturating_sub(10), v / 2])
        })
        .save(dir.join(name))
        .unwrap();
    }

    fn config(input: &Path, output: &Path) -> EvalConfigBuilder {
        EvalConfig::builder().input_dir(input).output_dir(output)
    }

    #[test]
    fn test_eval_config_builder() {
        let config = EvalConfig::builder()
            .input_dir("/tmp/low")
            .output_dir("/tmp/enhanced")
            .metric(MetricKind::Ssim)
            .metric(MetricKind::Psnr)
            .metric(MetricKind::Ssim)
            .ssim_window_size(7)
            .parallel(true)
            .report_dir("/tmp/reports")
            .build()
            .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/tmp/low"));
        assert_eq!(config.metrics, vec![MetricKind::Ssim, MetricKind::Psnr]);
        assert_eq!(config.ssim_window_size, 7);
        assert_eq!(config.clahe, ClaheParams::default());
        assert!(config.parallel);
        assert!(!config.strict);
        assert_eq!(config.report_dir, Some(PathBuf::from("/tmp/reports")));
    }

    #[test]
    fn test_eval_config_defaults() {
        let config = config(Path::new("a"), Path::new("b")).build().unwrap();
        assert_eq!(config.metrics, MetricKind::ALL.to_vec());
        assert_eq!(config.ssim_window_size, 3);
        assert!(!config.score_input_set);
        assert!(config.report_dir.is_none());
    }

    #[test]
    fn test_eval_config_rejects_invalid_values() {
        assert!(matches!(
            EvalConfig::builder().output_dir("b").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            config(Path::new("a"), Path::new("b")).ssim_window_size(4).build(),
            Err(Error::Configuration(_))
        ));
        let clahe = ClaheParams {
            clip_limit: -1.0,
            tiles: (8, 8),
        };
        assert!(config(Path::new("a"), Path::new("b")).clahe(clahe).build().is_err());
    }

    #[test]
    fn test_end_to_end_collision_and_counts() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for (i, name) in ["A_1_x.png", "A_1_y.png", "B_2.png"].iter().enumerate() {
            write(input.path(), name, 20, 20, i as u32);
            write(output.path(), name, 20, 20, i as u32 + 3);
        }

        let config = config(input.path(), output.path())
            .metric(MetricKind::Psnr)
            .build()
            .unwrap();
        let reports = EvalSession::new(config).run().unwrap();

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.summary.count(), 2);
        let keys: Vec<&str> = report.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["A_1", "B_2.png"]);

        // One collision per directory, both resolved to the same file.
        assert_eq!(report.collisions.len(), 2);
        for collision in &report.collisions {
            assert_eq!(collision.key.as_str(), "A_1");
            assert!(collision.kept.ends_with("A_1_y.png"));
            assert!(collision.replaced.ends_with("A_1_x.png"));
        }
    }

    #[test]
    fn test_identical_directories() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for (i, name) in ["low_001.png", "low_002.png"].iter().enumerate() {
            write(input.path(), name, 24, 16, i as u32);
            write(output.path(), name, 24, 16, i as u32);
        }

        let config = config(input.path(), output.path())
            .metrics([MetricKind::Psnr, MetricKind::Ssim])
            .build()
            .unwrap();
        let reports = EvalSession::new(config).run().unwrap();

        assert!(reports[0].records.iter().all(|r| (r.score - PSNR_MAX).abs() < 1e-9));
        assert!(reports[1].records.iter().all(|r| r.score == 1.0));
        assert_eq!(reports[1].summary.std_dev(), Some(0.0));
    }

    #[test]
    fn test_missing_keys_abort_before_scoring() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "a_1.png", 8, 8, 0);
        write(input.path(), "b_2.png", 8, 8, 0);
        write(output.path(), "a_1.png", 8, 8, 0);

        let mut events = 0;
        let config = config(input.path(), output.path()).build().unwrap();
        let err = EvalSession::new(config).run_with(|_| events += 1).unwrap_err();

        assert_eq!(events, 0);
        match err {
            Error::Correspondence {
                missing_from_output,
                missing_from_input,
            } => {
                assert_eq!(missing_from_output.len(), 1);
                assert_eq!(missing_from_output[0].as_str(), "b_2.png");
                assert!(missing_from_input.is_empty());
            }
            other => panic!("expected correspondence error, got {other:?}"),
        }
    }

    #[test]
    fn test_dimension_mismatch_degrades_run() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "a_1.png", 100, 100, 0);
        write(output.path(), "a_1.png", 100, 120, 0);
        write(input.path(), "b_2.png", 16, 16, 0);
        write(output.path(), "b_2.png", 16, 16, 1);

        let config = config(input.path(), output.path())
            .metric(MetricKind::Psnr)
            .build()
            .unwrap();
        let reports = EvalSession::new(config).run().unwrap();
        let report = &reports[0];

        assert_eq!(report.status(), RunStatus::Degraded);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failures[0].key.as_str(), "a_1.png");
        assert!(report.failures[0].reason.contains("(100, 100, 3)"));
        assert!(report.failures[0].reason.contains("(120, 100, 3)"));
    }

    #[test]
    fn test_empty_directories_give_no_data() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let config = config(input.path(), output.path()).build().unwrap();
        let reports = EvalSession::new(config).run().unwrap();

        assert_eq!(reports.len(), 4);
        for report in &reports {
            assert_eq!(report.status(), RunStatus::NoData);
            assert!(report.render().contains("no data"));
        }
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let output = TempDir::new().unwrap();
        let config = config(Path::new("/nonexistent/low"), output.path()).build().unwrap();
        assert!(matches!(
            EvalSession::new(config).run(),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_output_directory_is_checked_before_decoding() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "a_1.png", 8, 8, 0);
        fs::write(input.path().join("b_2.png"), b"not a png").unwrap();
        let missing = output.path().join("enhanced");

        let config = config(input.path(), &missing).build().unwrap();
        let mut events = 0;
        let err = EvalSession::new(config).run_with(|_| events += 1).unwrap_err();

        assert!(matches!(err, Error::NotFound { path } if path == missing));
        assert_eq!(events, 0);
    }

    #[test]
    fn test_enhance_uses_configured_directories_and_params() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "low_001_a.png", 24, 16, 0);
        write(input.path(), "low_002_a.png", 24, 16, 1);
        let enhanced = output.path().join("enhanced");

        let clahe = ClaheParams {
            clip_limit: 2.0,
            tiles: (4, 2),
        };
        let config = config(input.path(), &enhanced)
            .clahe(clahe)
            .metric(MetricKind::Psnr)
            .build()
            .unwrap();
        let session = EvalSession::new(config);

        let summary = session.enhance().unwrap();
        assert_eq!(summary.written.len(), 2);
        assert!(summary.failed.is_empty());

        let direct = crate::enhance::enhance_image(
            crate::corpus::decode_image(&input.path().join("low_001_a.png"))
                .unwrap()
                .as_ref(),
            &clahe,
        );
        let written = crate::corpus::decode_image(&enhanced.join("low_001_a.png")).unwrap();
        assert_eq!(written.buf(), direct.buf());

        // The enhanced directory pairs up with its source.
        let reports = session.run().unwrap();
        assert_eq!(reports[0].records.len(), 2);
        assert_eq!(reports[0].status(), RunStatus::Complete);
    }

    #[test]
    fn test_runs_are_idempotent_and_write_reports() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let reports_dir = TempDir::new().unwrap();
        for (i, name) in ["k_1.png", "k_2.png", "k_3.png"].iter().enumerate() {
            write(input.path(), name, 16, 12, i as u32);
            write(output.path(), name, 16, 12, i as u32 + 7);
        }

        let config = config(input.path(), output.path())
            .report_dir(reports_dir.path())
            .parallel(true)
            .build()
            .unwrap();
        let session = EvalSession::new(config);

        let mut finished = Vec::new();
        let first = session
            .run_with(|event| {
                if let SessionEvent::Finished(report) = event {
                    finished.push(report.metric.name.clone());
                }
            })
            .unwrap();
        let second = session.run().unwrap();

        assert_eq!(finished, vec!["PSNR", "SSIM", "BRISQUE", "NIQE"]);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.records, b.records);
            assert_eq!(a.summary, b.summary);
        }
        for stem in ["psnr", "ssim", "brisque", "niqe"] {
            assert!(reports_dir.path().join(format!("{stem}.json")).is_file());
            assert!(reports_dir.path().join(format!("{stem}.csv")).is_file());
        }
    }
}
