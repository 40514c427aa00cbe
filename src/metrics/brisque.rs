//! Simplified BRISQUE: a linear model over log-magnitude spectrum statistics.
//!
//! The 8-bit grayscale image is transformed with a 2-D FFT. The spectrum
//! magnitude is compressed with `ln(1 + |F|)`, and the population standard
//! deviation and the mean of that log-magnitude are fed to a fixed linear
//! model. Both statistics are invariant to a circular shift of the spectrum,
//! so no quadrant swap is applied.

use rustfft::{FftPlanner, num_complex::Complex};

use crate::error::{Error, Result, Shape};
use crate::metrics::{ColorSpace, MetricInfo, NoReferenceMetric, Precision, Raster, ScoreDirection};

const INTERCEPT: f64 = 18.9217;
const STD_WEIGHT: f64 = -0.0977446;
const MEAN_WEIGHT: f64 = 0.0270277;

/// Spectrum features: `[std, mean]` of the log-magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumFeatures {
    pub std_dev: f64,
    pub mean: f64,
}

impl SpectrumFeatures {
    /// Apply the linear quality model.
    #[must_use]
    pub fn score(&self) -> f64 {
        INTERCEPT + STD_WEIGHT * self.std_dev + MEAN_WEIGHT * self.mean
    }
}

/// Log-magnitude spectrum statistics of a row-major grayscale plane.
#[must_use]
pub fn spectrum_features(gray: &[u8], width: usize, height: usize) -> SpectrumFeatures {
    let log_magnitude: Vec<f64> = fft_2d(gray, width, height)
        .iter()
        .map(|c| c.norm().ln_1p())
        .collect();

    let n = log_magnitude.len() as f64;
    let mean = log_magnitude.iter().sum::<f64>() / n;
    let variance = log_magnitude.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    SpectrumFeatures {
        std_dev: variance.sqrt(),
        mean,
    }
}

/// 2-D forward FFT by row-column decomposition.
fn fft_2d(gray: &[u8], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(width);
    let col_fft = planner.plan_fft_forward(height);

    let mut data: Vec<Complex<f64>> = gray
        .iter()
        .map(|&v| Complex::new(f64::from(v), 0.0))
        .collect();

    for row in data.chunks_exact_mut(width) {
        row_fft.process(row);
    }

    let mut columns = transpose(&data, width, height);
    for col in columns.chunks_exact_mut(height) {
        col_fft.process(col);
    }

    columns
}

/// Transpose a `height × width` row-major buffer into `width × height`.
fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

/// Simplified BRISQUE on a BGR raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct Brisque;

impl NoReferenceMetric for Brisque {
    fn info(&self) -> MetricInfo {
        MetricInfo {
            name: "BRISQUE".to_string(),
            colorspace: ColorSpace::Bgr,
            precision: Precision::U8,
            direction: ScoreDirection::Unspecified,
            decimals: 4,
            unit: None,
        }
    }

    fn check(&self, (height, width, _): Shape) -> Result<()> {
        if height == 0 || width == 0 {
            return Err(Error::MetricCalculation {
                metric: "BRISQUE".to_string(),
                reason: format!("cannot transform an empty {width}x{height} image"),
            });
        }
        Ok(())
    }

    fn compute(&self, image: &Raster) -> Result<f64> {
        self.check(image.shape())?;
        let gray = image.luma_u8();
        Ok(spectrum_features(&gray, image.width(), image.height()).score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::ImgVec;
    use rgb::RGB8;

    fn raster(pixels: Vec<RGB8>, width: usize, height: usize) -> Raster {
        let img = ImgVec::new(pixels, width, height);
        Raster::from_rgb(img.as_ref(), ColorSpace::Bgr)
    }

    #[test]
    fn test_constant_image_spectrum() {
        // Only the DC term is non-zero: 16 * 100 = 1600.
        let features = spectrum_features(&[100u8; 16], 4, 4);
        let dc = 1600f64.ln_1p();
        let expected_mean = dc / 16.0;
        assert!((features.mean - expected_mean).abs() < 1e-9);
        let expected_var = ((dc - expected_mean).powi(2) + 15.0 * expected_mean.powi(2)) / 16.0;
        assert!((features.std_dev - expected_var.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_black_image_scores_intercept() {
        let r = raster(vec![RGB8::new(0, 0, 0); 12], 4, 3);
        let score = Brisque.compute(&r).unwrap();
        assert!((score - INTERCEPT).abs() < 1e-12);
    }

    #[test]
    fn test_rectangular_image_is_finite() {
        let pixels = (0..35u8).map(|i| RGB8::new(i * 7, i * 3, 255 - i)).collect();
        let r = raster(pixels, 7, 5);
        assert!(Brisque.compute(&r).unwrap().is_finite());
    }

    #[test]
    fn test_spectrum_invariant_to_circular_shift() {
        let a: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(29)).collect();
        let mut b = a.clone();
        b.rotate_left(6);
        let fa = spectrum_features(&a, 6, 4);
        let fb = spectrum_features(&b, 6, 4);
        assert!((fa.mean - fb.mean).abs() < 1e-9);
        assert!((fa.std_dev - fb.std_dev).abs() < 1e-9);
    }
}
