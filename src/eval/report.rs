//! Aggregated results of an evaluation run.
//!
//! An [`EvalReport`] holds everything produced for one metric: the per-key
//! records and failures, the [`SummaryStatistics`], the loader's skips and
//! collisions and the configuration used. Reports render to the fixed text
//! layout printed by the CLI and serialize to JSON and CSV.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::corpus::{KeyCollision, SkippedFile};
use crate::error::Result;
use crate::eval::batch::{Evaluation, FailedKey, ScoreRecord};
use crate::eval::session::EvalConfig;
use crate::metrics::{MetricInfo, ScoreDirection};
use crate::stats::Summary;

/// Aggregate of one metric's scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Metric display name.
    pub metric: String,
    /// Which way the score improves.
    pub direction: ScoreDirection,
    /// Output scores; `None` when no key was scored.
    pub scores: Option<Summary>,
    /// Number of keys that failed.
    pub failed: usize,
    /// Input-set scores, when the input set was scored too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Summary>,
    /// Output minus input, when the input set was scored too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Summary>,
}

impl SummaryStatistics {
    /// Summarize an evaluation.
    #[must_use]
    pub fn summarize(info: &MetricInfo, evaluation: &Evaluation) -> Self {
        Self {
            metric: info.name.clone(),
            direction: info.direction,
            scores: Summary::compute(&evaluation.scores()),
            failed: evaluation.failures.len(),
            baseline: Summary::compute(&evaluation.baselines()),
            delta: Summary::compute(&evaluation.deltas()),
        }
    }

    /// Number of scored keys.
    #[must_use]
    pub fn count(&self) -> usize {
        self.scores.as_ref().map_or(0, |s| s.count)
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        self.scores.as_ref().map(|s| s.mean)
    }

    #[must_use]
    pub fn std_dev(&self) -> Option<f64> {
        self.scores.as_ref().map(|s| s.std_dev)
    }
}

/// Overall outcome of one metric's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every key was scored.
    Complete,
    /// Some keys failed, at least one was scored.
    Degraded,
    /// No key was scored.
    NoData,
}

/// Report for one metric over one pair of image sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Metric descriptor.
    pub metric: MetricInfo,

    /// Per-key scores in key order.
    pub records: Vec<ScoreRecord>,

    /// Keys that could not be scored.
    pub failures: Vec<FailedKey>,

    /// Aggregate statistics.
    pub summary: SummaryStatistics,

    /// Files left out of either set while loading.
    #[serde(default)]
    pub skipped: Vec<SkippedFile>,

    /// Key collisions seen while loading either set.
    #[serde(default)]
    pub collisions: Vec<KeyCollision>,

    /// Configuration used for this run.
    pub config: EvalConfig,

    /// Time spent scoring.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    /// When this report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl EvalReport {
    /// Build a report from a finished evaluation.
    #[must_use]
    pub fn new(metric: MetricInfo, evaluation: Evaluation, config: EvalConfig) -> Self {
        let summary = SummaryStatistics::summarize(&metric, &evaluation);
        Self {
            metric,
            records: evaluation.records,
            failures: evaluation.failures,
            summary,
            skipped: Vec::new(),
            collisions: Vec::new(),
            config,
            elapsed: Duration::ZERO,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Run outcome derived from records and failures.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.records.is_empty() {
            RunStatus::NoData
        } else if self.failures.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Degraded
        }
    }

    /// Base name of the report files, e.g. `psnr`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.metric.name.to_ascii_lowercase()
    }

    /// Per-key lines followed by the summary block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&format_record(&self.metric, record));
            out.push('\n');
        }
        out.push_str(&self.render_summary());
        out
    }

    /// The summary block alone.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let info = &self.metric;
        let value = |v: Option<f64>| {
            v.map_or_else(|| "no data".to_string(), |v| info.format_score(v))
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "===== RESULTS ({}, {}, {}) =====",
            info.name, info.precision, info.direction
        );
        let _ = writeln!(out, "Mean {}: {}", info.name, value(self.summary.mean()));
        let _ = writeln!(out, "Std dev: {}", value(self.summary.std_dev()));
        let _ = writeln!(out, "Total images: {}", self.summary.count());

        if let Some(baseline) = &self.summary.baseline {
            let _ = writeln!(
                out,
                "Mean input {}: {}",
                info.name,
                info.format_score(baseline.mean)
            );
        }
        if let Some(delta) = &self.summary.delta {
            let _ = writeln!(out, "Mean delta: {}", info.format_score(delta.mean));
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "Failed keys ({}):", self.failures.len());
            for failure in &self.failures {
                let _ = writeln!(out, "  {}: {}", failure.key, failure.reason);
            }
        }
        out
    }

    /// Write `<metric>.json` and `<metric>.csv` into `dir`.
    ///
    /// Returns the two paths written.
    pub fn write_to(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join(format!("{}.json", self.file_stem()));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&json_path, json)?;

        let csv_path = dir.join(format!("{}.csv", self.file_stem()));
        self.write_csv(&csv_path)?;

        Ok((json_path, csv_path))
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["key", "score", "baseline", "delta"])?;

        let optional = |v: Option<f64>| v.map_or(String::new(), |v| v.to_string());
        for record in &self.records {
            wtr.write_record([
                record.key.as_str(),
                &record.score.to_string(),
                &optional(record.baseline),
                &optional(record.delta),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

/// One per-key line: `<key>: <METRIC> = <value>[ <unit>]`.
#[must_use]
pub fn format_record(info: &MetricInfo, record: &ScoreRecord) -> String {
    let mut line = format!("{}: {} = {}", record.key, info.name, info.format_score(record.score));
    if let (Some(baseline), Some(delta)) = (record.baseline, record.delta) {
        let _ = write!(
            line,
            " (input {}, delta {:+.*})",
            info.format_score(baseline),
            info.decimals,
            delta
        );
    }
    line
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
