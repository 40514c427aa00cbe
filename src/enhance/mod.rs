//! CLAHE low-light enhancement.
//!
//! Each image is converted to 8-bit L*a*b*, the lightness channel is
//! equalized with [`clahe::apply`], the result is converted back to sRGB and
//! finally brightened with `|1.2 v + 15|` per sample. Enhanced files keep
//! their original filename so key derivation matches the source directory.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lowlight_eval::enhance::{ClaheParams, enhance_directory};
//!
//! let summary = enhance_directory("./low", "./enhanced", &ClaheParams::default(), true)?;
//! println!("{} written, {} failed", summary.written.len(), summary.failed.len());
//! ```

pub mod clahe;
pub mod lab;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use imgref::{ImgRef, ImgVec};
use rayon::prelude::*;
use rgb::RGB8;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::{Listing, SkippedFile, decode_image, list_candidates};
use crate::error::{Error, Result};

/// Gain of the final brightness adjustment.
pub const BRIGHTNESS_GAIN: f32 = 1.2;
/// Offset of the final brightness adjustment.
pub const BRIGHTNESS_OFFSET: f32 = 15.0;
/// Quality used when re-encoding JPEG output.
pub const JPEG_QUALITY: u8 = 95;

/// CLAHE parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaheParams {
    /// Contrast limit relative to a uniform histogram.
    pub clip_limit: f64,
    /// Tile grid as (columns, rows).
    pub tiles: (usize, usize),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tiles: (8, 8),
        }
    }
}

impl ClaheParams {
    /// Check the parameters before any image is processed.
    pub fn validate(&self) -> Result<()> {
        if !self.clip_limit.is_finite() || self.clip_limit <= 0.0 {
            return Err(Error::Configuration(format!(
                "CLAHE clip limit must be a positive number, got {}",
                self.clip_limit
            )));
        }
        if self.tiles.0 == 0 || self.tiles.1 == 0 {
            return Err(Error::Configuration(format!(
                "CLAHE tile grid must be at least 1x1, got {}x{}",
                self.tiles.0, self.tiles.1
            )));
        }
        Ok(())
    }
}

/// Outcome of [`enhance_directory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhanceSummary {
    /// Files written to the output directory, in input order.
    pub written: Vec<PathBuf>,
    /// Input files that could not be decoded, enhanced or written.
    pub failed: Vec<SkippedFile>,
    /// Directory entries that were not candidates at all.
    pub skipped: Vec<SkippedFile>,
}

/// Enhance one decoded image.
#[must_use]
pub fn enhance_image(image: ImgRef<'_, RGB8>, params: &ClaheParams) -> ImgVec<RGB8> {
    let (width, height) = (image.width(), image.height());
    let labs: Vec<lab::Lab8> = image.pixels().map(lab::rgb_to_lab).collect();

    let lightness: Vec<u8> = labs.iter().map(|p| p.l).collect();
    let equalized = clahe::apply(&lightness, width, height, params.clip_limit, params.tiles);

    let brighten =
        |v: u8| lab::saturate_u8((BRIGHTNESS_GAIN * f32::from(v) + BRIGHTNESS_OFFSET).abs());
    let pixels = labs
        .iter()
        .zip(equalized)
        .map(|(p, l)| {
            let rgb = lab::lab_to_rgb(lab::Lab8 { l, ..*p });
            RGB8::new(brighten(rgb.r), brighten(rgb.g), brighten(rgb.b))
        })
        .collect();

    ImgVec::new(pixels, width, height)
}

/// Encode `image` to `path`, picking the format from the extension.
pub fn save_image(image: ImgRef<'_, RGB8>, path: &Path) -> Result<()> {
    let enhance_error = |reason: String| Error::Enhance {
        path: path.to_path_buf(),
        reason,
    };

    let raw: Vec<u8> = image.pixels().flat_map(|p| [p.r, p.g, p.b]).collect();
    let buffer = RgbImage::from_raw(image.width() as u32, image.height() as u32, raw)
        .ok_or_else(|| enhance_error("pixel buffer does not match dimensions".to_string()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let writer = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            encoder.encode_image(&buffer)?;
        }
        "png" => buffer.save_with_format(path, ImageFormat::Png)?,
        "bmp" => buffer.save_with_format(path, ImageFormat::Bmp)?,
        other => return Err(enhance_error(format!("unsupported output extension '{other}'"))),
    }
    Ok(())
}

/// Decode, enhance and write a single file.
pub fn enhance_file(source: &Path, destination: &Path, params: &ClaheParams) -> Result<()> {
    let pixels = decode_image(source)?;
    let enhanced = enhance_image(pixels.as_ref(), params);
    save_image(enhanced.as_ref(), destination)?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        "enhanced image"
    );
    Ok(())
}

/// Enhance every supported image in `input` into `output`.
///
/// Files are visited in sorted filename order. A file that fails is recorded
/// in [`EnhanceSummary::failed`] and the run continues.
pub fn enhance_directory(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &ClaheParams,
    parallel: bool,
) -> Result<EnhanceSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    params.validate()?;

    let Listing { files, skipped } = list_candidates(input)?;
    fs::create_dir_all(output)?;

    if files.is_empty() {
        warn!(dir = %input.display(), "no images found to enhance");
        return Ok(EnhanceSummary {
            skipped,
            ..EnhanceSummary::default()
        });
    }

    info!(
        images = files.len(),
        output = %output.display(),
        "enhancing images"
    );

    let process = |source: &PathBuf| -> (PathBuf, Result<PathBuf>) {
        let destination = output.join(source.file_name().unwrap_or_default());
        let result = enhance_file(source, &destination, params).map(|()| destination);
        (source.clone(), result)
    };

    let results: Vec<(PathBuf, Result<PathBuf>)> = if parallel {
        files.par_iter().map(process).collect()
    } else {
        files.iter().map(process).collect()
    };

    let mut summary = EnhanceSummary {
        skipped,
        ..EnhanceSummary::default()
    };
    for (source, result) in results {
        match result {
            Ok(destination) => summary.written.push(destination),
            Err(e) => {
                warn!(path = %source.display(), error = %e, "failed to enhance image");
                summary.failed.push(SkippedFile {
                    path: source,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        written = summary.written.len(),
        failed = summary.failed.len(),
        "enhancement finished"
    );
    Ok(summary)
}
