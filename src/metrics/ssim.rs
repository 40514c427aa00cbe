//! SSIM (Structural Similarity) with a uniform window.
//!
//! Each channel is scored independently and the per-channel means are
//! averaged. Local statistics use a `w × w` box window with sample
//! covariance (`N / (N - 1)` normalization), and only pixels whose window
//! lies entirely inside the image contribute to the mean.

use crate::error::{Error, Result, Shape};
use crate::metrics::{ColorSpace, MetricInfo, Precision, Raster, ReferencedMetric, ScoreDirection};

/// Default window side length.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

const DATA_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Check that a window size is odd and at least 3.
pub fn validate_window_size(window: usize) -> Result<()> {
    if window < 3 || window % 2 == 0 {
        return Err(Error::Configuration(format!(
            "SSIM window size must be odd and at least 3, got {window}"
        )));
    }
    Ok(())
}

/// Summed-area table of a plane and of its products, `(width + 1) × (height + 1)`.
struct Integral {
    stride: usize,
    sums: Vec<u64>,
}

impl Integral {
    fn new(width: usize, height: usize, value: impl Fn(usize) -> u64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0u64;
            for x in 0..width {
                row += value(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over rows `y0..y1` and columns `x0..x1`.
    #[inline]
    fn window(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = &self.sums;
        let total = s[y1 * self.stride + x1] + s[y0 * self.stride + x0];
        let excluded = s[y0 * self.stride + x1] + s[y1 * self.stride + x0];
        (total - excluded) as f64
    }
}

/// Mean SSIM of one 8-bit plane pair.
///
/// `window` must be odd and no larger than either dimension.
#[must_use]
pub fn calculate_ssim_plane(x: &[u8], y: &[u8], width: usize, height: usize, window: usize) -> f64 {
    assert_eq!(x.len(), width * height);
    assert_eq!(y.len(), width * height);
    assert!(window <= width && window <= height);

    let sx = Integral::new(width, height, |i| u64::from(x[i]));
    let sy = Integral::new(width, height, |i| u64::from(y[i]));
    let sxx = Integral::new(width, height, |i| u64::from(x[i]) * u64::from(x[i]));
    let syy = Integral::new(width, height, |i| u64::from(y[i]) * u64::from(y[i]));
    let sxy = Integral::new(width, height, |i| u64::from(x[i]) * u64::from(y[i]));

    let np = (window * window) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y0 in 0..=height - window {
        for x0 in 0..=width - window {
            let (x1, y1) = (x0 + window, y0 + window);

            let ux = sx.window(x0, y0, x1, y1) / np;
            let uy = sy.window(x0, y0, x1, y1) / np;
            let uxx = sxx.window(x0, y0, x1, y1) / np;
            let uyy = syy.window(x0, y0, x1, y1) / np;
            let uxy = sxy.window(x0, y0, x1, y1) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let a1 = 2.0 * ux * uy + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = ux * ux + uy * uy + c1;
            let b2 = vx + vy + c2;

            total += (a1 * a2) / (b1 * b2);
            count += 1;
        }
    }

    total / count as f64
}

/// Multichannel SSIM on RGB rasters.
#[derive(Debug, Clone, Copy)]
pub struct Ssim {
    window: usize,
}

impl Ssim {
    /// Create an SSIM strategy with the given window size.
    pub fn new(window: usize) -> Result<Self> {
        validate_window_size(window)?;
        Ok(Self { window })
    }

    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window
    }
}

impl Default for Ssim {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl ReferencedMetric for Ssim {
    fn info(&self) -> MetricInfo {
        MetricInfo {
            name: "SSIM".to_string(),
            colorspace: ColorSpace::Rgb,
            precision: Precision::Float,
            direction: ScoreDirection::HigherIsBetter,
            decimals: 4,
            unit: None,
        }
    }

    fn check(&self, (height, width, _): Shape) -> Result<()> {
        let smaller = height.min(width);
        if self.window > smaller {
            return Err(Error::Configuration(format!(
                "SSIM window size {} exceeds the smaller image dimension {}",
                self.window, smaller
            )));
        }
        Ok(())
    }

    fn compute(&self, reference: &Raster, candidate: &Raster) -> Result<f64> {
        self.check(reference.shape())?;
        let (width, height) = (reference.width(), reference.height());

        let channels = reference.channels();
        let sum: f64 = (0..channels)
            .map(|c| {
                calculate_ssim_plane(
                    &reference.plane(c),
                    &candidate.plane(c),
                    width,
                    height,
                    self.window,
                )
            })
            .sum();
        Ok(sum / channels as f64)
    }
}
