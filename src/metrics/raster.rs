//! Colorspace-normalized pixel view handed to metric strategies.

use imgref::ImgRef;
use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::error::Shape;

/// Channel order of an interleaved 3-channel raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Bgr,
    Rgb,
}

// Fixed-point BT.601 luma weights (Q14), as used by common 8-bit color conversions.
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

// Rec.709 luma weights on normalized samples.
const REC709_R: f64 = 0.2125;
const REC709_G: f64 = 0.7154;
const REC709_B: f64 = 0.0721;

/// An interleaved height × width × 3 grid of 8-bit samples in a declared
/// channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    colorspace: ColorSpace,
    data: Vec<u8>,
}

impl Raster {
    /// Lay out an RGB image in the requested channel order.
    #[must_use]
    pub fn from_rgb(image: ImgRef<'_, RGB8>, colorspace: ColorSpace) -> Self {
        let mut data = Vec::with_capacity(image.width() * image.height() * 3);
        for p in image.pixels() {
            match colorspace {
                ColorSpace::Rgb => data.extend_from_slice(&[p.r, p.g, p.b]),
                ColorSpace::Bgr => data.extend_from_slice(&[p.b, p.g, p.r]),
            }
        }
        Self {
            width: image.width(),
            height: image.height(),
            colorspace,
            data,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        3
    }

    #[must_use]
    pub fn colorspace(&self) -> ColorSpace {
        self.colorspace
    }

    /// Shape as (height, width, channels).
    #[must_use]
    pub fn shape(&self) -> Shape {
        (self.height, self.width, 3)
    }

    /// Interleaved samples in [`colorspace`](Self::colorspace) order.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.data
    }

    /// One channel (by position in the interleaved order) as a row-major plane.
    #[must_use]
    pub fn plane(&self, channel: usize) -> Vec<u8> {
        self.data.iter().skip(channel).step_by(3).copied().collect()
    }

    /// Pixel at row-major index `i` as (r, g, b), whatever the storage order.
    #[inline]
    #[must_use]
    pub fn rgb_at(&self, i: usize) -> (u8, u8, u8) {
        let px = &self.data[i * 3..i * 3 + 3];
        match self.colorspace {
            ColorSpace::Rgb => (px[0], px[1], px[2]),
            ColorSpace::Bgr => (px[2], px[1], px[0]),
        }
    }

    /// 8-bit BT.601 grayscale, rounded in fixed point.
    #[must_use]
    pub fn luma_u8(&self) -> Vec<u8> {
        (0..self.width * self.height)
            .map(|i| {
                let (r, g, b) = self.rgb_at(i);
                let y = u32::from(r) * LUMA_R
                    + u32::from(g) * LUMA_G
                    + u32::from(b) * LUMA_B
                    + (1 << (LUMA_SHIFT - 1));
                (y >> LUMA_SHIFT) as u8
            })
            .collect()
    }

    /// Floating-point Rec.709 luma on samples normalized to `[0, 1]`.
    #[must_use]
    pub fn luma_f64(&self) -> Vec<f64> {
        (0..self.width * self.height)
            .map(|i| {
                let (r, g, b) = self.rgb_at(i);
                (REC709_R * f64::from(r) + REC709_G * f64::from(g) + REC709_B * f64::from(b))
                    / 255.0
            })
            .collect()
    }
}
