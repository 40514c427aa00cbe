//! PSNR (Peak Signal-to-Noise Ratio).

use crate::error::{Error, Result};
use crate::metrics::{ColorSpace, MetricInfo, Precision, Raster, ReferencedMetric, ScoreDirection};

/// PSNR of two identical images: `20 * log10(255 / f64::EPSILON)`.
pub const PSNR_MAX: f64 = 361.20199909921956;

/// Calculate PSNR between two equally sized 8-bit sample buffers.
///
/// # Returns
///
/// PSNR value in decibels. Higher is better. The root mean squared error is
/// offset by `f64::EPSILON`, so identical inputs give the finite maximum
/// [`PSNR_MAX`] rather than infinity.
#[must_use]
pub fn calculate_psnr(reference: &[u8], test: &[u8]) -> f64 {
    assert_eq!(reference.len(), test.len());

    let mut mse_sum: f64 = 0.0;
    for (r, t) in reference.iter().zip(test.iter()) {
        let diff = f64::from(*r) - f64::from(*t);
        mse_sum += diff * diff;
    }

    let mse = mse_sum / reference.len().max(1) as f64;
    20.0 * (255.0 / (mse.sqrt() + f64::EPSILON)).log10()
}

/// PSNR over every sample of a BGR raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct Psnr;

impl ReferencedMetric for Psnr {
    fn info(&self) -> MetricInfo {
        MetricInfo {
            name: "PSNR".to_string(),
            colorspace: ColorSpace::Bgr,
            precision: Precision::U8,
            direction: ScoreDirection::HigherIsBetter,
            decimals: 2,
            unit: Some("dB".to_string()),
        }
    }

    fn compute(&self, reference: &Raster, candidate: &Raster) -> Result<f64> {
        if reference.shape() != candidate.shape() {
            return Err(Error::DimensionMismatch {
                expected: reference.shape(),
                actual: candidate.shape(),
            });
        }
        Ok(calculate_psnr(reference.samples(), candidate.samples()))
    }
}
