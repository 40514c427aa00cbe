//! Quality metrics for before/after image comparison.
//!
//! Metrics come in two capability variants:
//!
//! - **Referenced** ([`ReferencedMetric`]): score a candidate against a
//!   reference of identical shape. PSNR and SSIM.
//! - **No-reference** ([`NoReferenceMetric`]): score a single image.
//!   Simplified BRISQUE and NIQE.
//!
//! [`MetricAdapter`] wraps either variant behind one call surface. It owns
//! every precondition the metrics share: shape equality for referenced
//! metrics, conversion into the colorspace each metric declares, per-metric
//! configuration checks, and rejection of non-finite scores.
//!
//! ## Catalogue
//!
//! | Metric  | Variant      | Colorspace | Precision | Direction        |
//! |---------|--------------|------------|-----------|------------------|
//! | PSNR    | referenced   | BGR        | 8-bit     | higher is better |
//! | SSIM    | referenced   | RGB        | float     | higher is better |
//! | BRISQUE | no-reference | BGR        | 8-bit     | no fixed direction |
//! | NIQE    | no-reference | RGB        | float     | lower is better  |

pub mod brisque;
pub mod niqe;
pub mod psnr;
pub mod raster;
pub mod ssim;

use std::fmt;
use std::str::FromStr;

use imgref::ImgRef;
use rgb::RGB8;
use serde::{Deserialize, Serialize};

pub use raster::{ColorSpace, Raster};

use crate::error::{Error, Result, Shape};

/// Which way a score improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreDirection {
    HigherIsBetter,
    LowerIsBetter,
    /// Model-fit score without a fixed better direction.
    Unspecified,
}

impl fmt::Display for ScoreDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HigherIsBetter => write!(f, "higher is better"),
            Self::LowerIsBetter => write!(f, "lower is better"),
            Self::Unspecified => write!(f, "no fixed direction"),
        }
    }
}

/// Numeric precision a metric computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// 8-bit integer intermediates.
    U8,
    /// Floating-point intermediates.
    Float,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// Static description of a metric strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    /// Display name, e.g. `PSNR`.
    pub name: String,
    /// Channel order the metric expects its input in.
    pub colorspace: ColorSpace,
    /// Numeric precision of the computation.
    pub precision: Precision,
    /// Semantic direction of the score.
    pub direction: ScoreDirection,
    /// Decimal places used when printing scores.
    pub decimals: usize,
    /// Unit suffix, e.g. `dB`.
    pub unit: Option<String>,
}

impl MetricInfo {
    /// Format a score with this metric's decimals and unit.
    #[must_use]
    pub fn format_score(&self, value: f64) -> String {
        match &self.unit {
            Some(unit) => format!("{:.*} {}", self.decimals, value, unit),
            None => format!("{:.*}", self.decimals, value),
        }
    }
}

/// Built-in metric selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Psnr,
    Ssim,
    Brisque,
    Niqe,
}

impl MetricKind {
    /// All built-in metrics, in report order.
    pub const ALL: [Self; 4] = [Self::Psnr, Self::Ssim, Self::Brisque, Self::Niqe];

    /// Lowercase identifier used on the command line and in file names.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Psnr => "psnr",
            Self::Ssim => "ssim",
            Self::Brisque => "brisque",
            Self::Niqe => "niqe",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "psnr" => Ok(Self::Psnr),
            "ssim" => Ok(Self::Ssim),
            "brisque" => Ok(Self::Brisque),
            "niqe" => Ok(Self::Niqe),
            other => Err(Error::Configuration(format!(
                "unknown metric '{other}' (expected psnr, ssim, brisque or niqe)"
            ))),
        }
    }
}

/// Configuration shared by the built-in metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// SSIM window side length. Odd, at least 3.
    pub ssim_window_size: usize,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            ssim_window_size: ssim::DEFAULT_WINDOW_SIZE,
        }
    }
}

impl MetricConfig {
    /// Check the configuration before any image is scored.
    pub fn validate(&self) -> Result<()> {
        ssim::validate_window_size(self.ssim_window_size)
    }
}

/// A metric that scores a candidate against a reference of the same shape.
pub trait ReferencedMetric: Send + Sync {
    /// Static description of the metric.
    fn info(&self) -> MetricInfo;

    /// Configuration preconditions for an image of `shape`, checked before
    /// computation.
    fn check(&self, _shape: Shape) -> Result<()> {
        Ok(())
    }

    /// Compute the score. Both rasters are in [`MetricInfo::colorspace`] and
    /// have identical shapes.
    fn compute(&self, reference: &Raster, candidate: &Raster) -> Result<f64>;
}

/// A metric that scores a single image.
pub trait NoReferenceMetric: Send + Sync {
    /// Static description of the metric.
    fn info(&self) -> MetricInfo;

    /// Configuration preconditions for an image of `shape`, checked before
    /// computation.
    fn check(&self, _shape: Shape) -> Result<()> {
        Ok(())
    }

    /// Compute the score. The raster is in [`MetricInfo::colorspace`].
    fn compute(&self, image: &Raster) -> Result<f64>;
}

/// Uniform invocation wrapper around a metric strategy.
pub enum MetricAdapter {
    /// `(reference, candidate) -> score`.
    Referenced(Box<dyn ReferencedMetric>),
    /// `(candidate) -> score`.
    NoReference(Box<dyn NoReferenceMetric>),
}

impl MetricAdapter {
    /// Build the adapter for a built-in metric.
    ///
    /// Fails with [`Error::Configuration`] when `config` is invalid.
    pub fn new(kind: MetricKind, config: &MetricConfig) -> Result<Self> {
        config.validate()?;
        Ok(match kind {
            MetricKind::Psnr => Self::referenced(psnr::Psnr),
            MetricKind::Ssim => Self::referenced(ssim::Ssim::new(config.ssim_window_size)?),
            MetricKind::Brisque => Self::no_reference(brisque::Brisque),
            MetricKind::Niqe => Self::no_reference(niqe::Niqe),
        })
    }

    /// Wrap a custom referenced metric.
    pub fn referenced(metric: impl ReferencedMetric + 'static) -> Self {
        Self::Referenced(Box::new(metric))
    }

    /// Wrap a custom no-reference metric.
    pub fn no_reference(metric: impl NoReferenceMetric + 'static) -> Self {
        Self::NoReference(Box::new(metric))
    }

    /// Description of the wrapped metric.
    #[must_use]
    pub fn info(&self) -> MetricInfo {
        match self {
            Self::Referenced(m) => m.info(),
            Self::NoReference(m) => m.info(),
        }
    }

    /// Whether the metric needs a reference image.
    #[must_use]
    pub fn requires_reference(&self) -> bool {
        matches!(self, Self::Referenced(_))
    }

    /// Score one before/after pair.
    ///
    /// Referenced metrics compare `output` against `input`; no-reference
    /// metrics score `output` alone.
    pub fn score(&self, input: ImgRef<'_, RGB8>, output: ImgRef<'_, RGB8>) -> Result<f64> {
        match self {
            Self::Referenced(metric) => {
                let expected = shape_of(input);
                let actual = shape_of(output);
                if expected != actual {
                    return Err(Error::DimensionMismatch { expected, actual });
                }
                metric.check(expected)?;

                let info = metric.info();
                let reference = Raster::from_rgb(input, info.colorspace);
                let candidate = Raster::from_rgb(output, info.colorspace);
                finite(&info, metric.compute(&reference, &candidate)?)
            }
            Self::NoReference(_) => self.score_single(output),
        }
    }

    /// Score a single image with a no-reference metric.
    ///
    /// Fails with [`Error::Configuration`] for referenced metrics.
    pub fn score_single(&self, image: ImgRef<'_, RGB8>) -> Result<f64> {
        match self {
            Self::Referenced(metric) => Err(Error::Configuration(format!(
                "{} needs a reference image",
                metric.info().name
            ))),
            Self::NoReference(metric) => {
                metric.check(shape_of(image))?;
                let info = metric.info();
                let raster = Raster::from_rgb(image, info.colorspace);
                finite(&info, metric.compute(&raster)?)
            }
        }
    }
}

impl fmt::Debug for MetricAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = if self.requires_reference() {
            "Referenced"
        } else {
            "NoReference"
        };
        f.debug_tuple(variant).field(&self.info().name).finish()
    }
}

fn shape_of(image: ImgRef<'_, RGB8>) -> Shape {
    (image.height(), image.width(), 3)
}

fn finite(info: &MetricInfo, score: f64) -> Result<f64> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(Error::MetricCalculation {
            metric: info.name.clone(),
            reason: format!("non-finite score {score}"),
        })
    }
}
