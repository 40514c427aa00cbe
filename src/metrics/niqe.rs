//! Simplified NIQE: a contrast-based naturalness score.
//!
//! Gradients of the normalized luma plane are taken along both axes
//! (central differences inside, one-sided at the borders). Their absolute
//! values form one pooled sample whose mean `m` and population standard
//! deviation `s` give `1 / (1 + 6.6 m + 0.228 s)`.

use crate::error::{Error, Result, Shape};
use crate::metrics::{ColorSpace, MetricInfo, NoReferenceMetric, Precision, Raster, ScoreDirection};

const MEAN_WEIGHT: f64 = 6.6;
const STD_WEIGHT: f64 = 0.228;

/// Absolute gradients of a row-major plane, rows axis first then columns.
///
/// Both dimensions must be at least 2.
#[must_use]
pub fn abs_gradients(plane: &[f64], width: usize, height: usize) -> Vec<f64> {
    let at = |x: usize, y: usize| plane[y * width + x];
    let mut out = Vec::with_capacity(plane.len() * 2);

    for y in 0..height {
        for x in 0..width {
            let dy = if y == 0 {
                at(x, 1) - at(x, 0)
            } else if y == height - 1 {
                at(x, y) - at(x, y - 1)
            } else {
                (at(x, y + 1) - at(x, y - 1)) / 2.0
            };
            out.push(dy.abs());
        }
    }

    for y in 0..height {
        for x in 0..width {
            let dx = if x == 0 {
                at(1, y) - at(0, y)
            } else if x == width - 1 {
                at(x, y) - at(x - 1, y)
            } else {
                (at(x + 1, y) - at(x - 1, y)) / 2.0
            };
            out.push(dx.abs());
        }
    }

    out
}

/// Score a pooled gradient sample.
#[must_use]
pub fn contrast_score(gradients: &[f64]) -> f64 {
    let n = gradients.len() as f64;
    let mean = gradients.iter().sum::<f64>() / n;
    let variance = gradients.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n;
    1.0 / (1.0 + MEAN_WEIGHT * mean + STD_WEIGHT * variance.sqrt())
}

/// Simplified NIQE on an RGB raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct Niqe;

impl NoReferenceMetric for Niqe {
    fn info(&self) -> MetricInfo {
        MetricInfo {
            name: "NIQE".to_string(),
            colorspace: ColorSpace::Rgb,
            precision: Precision::Float,
            direction: ScoreDirection::LowerIsBetter,
            decimals: 4,
            unit: None,
        }
    }

    fn check(&self, (height, width, _): Shape) -> Result<()> {
        if height < 2 || width < 2 {
            return Err(Error::MetricCalculation {
                metric: "NIQE".to_string(),
                reason: format!("gradients need at least 2x2 pixels, got {width}x{height}"),
            });
        }
        Ok(())
    }

    fn compute(&self, image: &Raster) -> Result<f64> {
        self.check(image.shape())?;
        let luma = image.luma_f64();
        Ok(contrast_score(&abs_gradients(&luma, image.width(), image.height())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::ImgVec;
    use rgb::RGB8;

    fn raster(pixels: Vec<RGB8>, width: usize, height: usize) -> Raster {
        let img = ImgVec::new(pixels, width, height);
        Raster::from_rgb(img.as_ref(), ColorSpace::Rgb)
    }

    #[test]
    fn test_flat_image_scores_one() {
        let r = raster(vec![RGB8::new(40, 80, 120); 20], 5, 4);
        assert_eq!(Niqe.compute(&r).unwrap(), 1.0);
    }

    #[test]
    fn test_gradients_match_edge_rules() {
        // Single row pair, values along x: 0, 1, 4
        let plane = [0.0, 1.0, 4.0, 0.0, 1.0, 4.0];
        let g = abs_gradients(&plane, 3, 2);
        // rows axis: identical rows
        assert_eq!(&g[..6], &[0.0; 6]);
        // columns axis: forward, central, backward
        assert_eq!(&g[6..9], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_textured_image_scores_below_one() {
        let pixels = (0..64)
            .map(|i| {
                if (i / 8 + i % 8) % 2 == 0 {
                    RGB8::new(0, 0, 0)
                } else {
                    RGB8::new(255, 255, 255)
                }
            })
            .collect();
        let score = Niqe.compute(&raster(pixels, 8, 8)).unwrap();
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_single_row_is_rejected() {
        let r = raster(vec![RGB8::new(1, 2, 3); 5], 5, 1);
        assert!(matches!(
            Niqe.compute(&r),
            Err(Error::MetricCalculation { .. })
        ));
    }
}
