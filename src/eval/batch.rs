//! Per-key scoring over a pair of image sets.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus::{ImageKey, ImageSet, LoadedImage, correspondence};
use crate::error::Result;
use crate::metrics::MetricAdapter;

/// Score for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Correspondence key.
    pub key: ImageKey,
    /// Metric value for the output image (or the pair).
    pub score: f64,
    /// Score of the input image, for no-reference metrics run on both sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    /// `score - baseline`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

/// A key whose score could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedKey {
    pub key: ImageKey,
    pub reason: String,
}

/// What happened to one key, as seen by an observer.
#[derive(Debug, Clone, Copy)]
pub enum KeyOutcome<'a> {
    Scored(&'a ScoreRecord),
    Failed(&'a FailedKey),
}

impl KeyOutcome<'_> {
    #[must_use]
    pub fn key(&self) -> &ImageKey {
        match self {
            Self::Scored(r) => &r.key,
            Self::Failed(f) => &f.key,
        }
    }
}

/// Batch evaluation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Score keys on the rayon thread pool.
    pub parallel: bool,
    /// Abort on the first failing key.
    pub strict: bool,
    /// Also score the input image with no-reference metrics.
    pub score_input_set: bool,
}

/// Records and failures of one metric over one pair of sets, in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub records: Vec<ScoreRecord>,
    pub failures: Vec<FailedKey>,
}

impl Evaluation {
    /// Output scores in key order.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.score).collect()
    }

    /// Input-set scores, where computed.
    #[must_use]
    pub fn baselines(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.baseline).collect()
    }

    /// Output minus input, where computed.
    #[must_use]
    pub fn deltas(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.delta).collect()
    }
}

/// Scores every key of a validated pair of sets with one metric.
pub struct BatchEvaluator<'a> {
    adapter: &'a MetricAdapter,
    options: BatchOptions,
}

impl<'a> BatchEvaluator<'a> {
    #[must_use]
    pub fn new(adapter: &'a MetricAdapter, options: BatchOptions) -> Self {
        Self { adapter, options }
    }

    /// Score all keys in ascending key order.
    ///
    /// The two sets must have identical keys; otherwise a correspondence
    /// error is returned before anything is scored.
    pub fn evaluate(&self, input: &ImageSet, output: &ImageSet) -> Result<Evaluation> {
        self.evaluate_with(input, output, |_| {})
    }

    /// Like [`evaluate`](Self::evaluate), reporting each key to `observer`.
    ///
    /// The observer always sees keys in ascending order, also when scoring
    /// runs in parallel. In strict mode the first failing key (in that order)
    /// is returned as the error.
    pub fn evaluate_with(
        &self,
        input: &ImageSet,
        output: &ImageSet,
        mut observer: impl FnMut(KeyOutcome<'_>),
    ) -> Result<Evaluation> {
        correspondence::validate(&input.key_set(), &output.key_set())?;

        // Equal key sets, both iterated in key order.
        let pairs: Vec<(&ImageKey, &LoadedImage, &LoadedImage)> = input
            .iter()
            .zip(output.iter())
            .map(|((key, before), (_, after))| (key, before, after))
            .collect();
        let mut evaluation = Evaluation::default();

        if self.options.parallel {
            let results: Vec<Result<ScoreRecord>> = pairs
                .par_iter()
                .map(|&(key, before, after)| self.score_key(key, before, after))
                .collect();
            for (&(key, _, _), result) in pairs.iter().zip(results) {
                self.record(&mut evaluation, key, result, &mut observer)?;
            }
        } else {
            for &(key, before, after) in &pairs {
                let result = self.score_key(key, before, after);
                self.record(&mut evaluation, key, result, &mut observer)?;
            }
        }

        Ok(evaluation)
    }

    fn score_key(
        &self,
        key: &ImageKey,
        before: &LoadedImage,
        after: &LoadedImage,
    ) -> Result<ScoreRecord> {
        let score = self.adapter.score(before.pixels.as_ref(), after.pixels.as_ref())?;

        // A failed baseline leaves the output score standing.
        let baseline = if self.options.score_input_set && !self.adapter.requires_reference() {
            match self.adapter.score_single(before.pixels.as_ref()) {
                Ok(baseline) => Some(baseline),
                Err(e) => {
                    warn!(
                        key = %key,
                        metric = %self.adapter.info().name,
                        error = %e,
                        "failed to score input image, no baseline"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(ScoreRecord {
            key: key.clone(),
            score,
            baseline,
            delta: baseline.map(|b| score - b),
        })
    }

    fn record(
        &self,
        evaluation: &mut Evaluation,
        key: &ImageKey,
        result: Result<ScoreRecord>,
        observer: &mut impl FnMut(KeyOutcome<'_>),
    ) -> Result<()> {
        let metric = self.adapter.info().name;
        match result {
            Ok(record) => {
                debug!(key = %key, metric = %metric, score = record.score, "scored key");
                evaluation.records.push(record);
                if let Some(record) = evaluation.records.last() {
                    observer(KeyOutcome::Scored(record));
                }
            }
            Err(e) if self.options.strict => return Err(e),
            Err(e) => {
                warn!(key = %key, metric = %metric, error = %e, "failed to score key");
                evaluation.failures.push(FailedKey {
                    key: key.clone(),
                    reason: e.to_string(),
                });
                if let Some(failure) = evaluation.failures.last() {
                    observer(KeyOutcome::Failed(failure));
                }
            }
        }
        Ok(())
    }
}
