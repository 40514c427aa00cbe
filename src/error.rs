//! Error types for lowlight-eval operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::corpus::ImageKey;

/// Result type alias for lowlight-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Image shape as (height, width, channels).
pub type Shape = (usize, usize, usize);

/// Errors that can occur while loading, pairing, scoring or enhancing images.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required input directory does not exist.
    #[error("Directory not found: {}", path.display())]
    NotFound {
        /// The directory that was requested.
        path: PathBuf,
    },

    /// The input and output key sets differ.
    #[error(
        "Image sets do not correspond: missing from output {}, missing from input {}",
        format_keys(missing_from_output),
        format_keys(missing_from_input)
    )]
    Correspondence {
        /// Keys present in the input set only.
        missing_from_output: Vec<ImageKey>,
        /// Keys present in the output set only.
        missing_from_input: Vec<ImageKey>,
    },

    /// A file could not be decoded as an image.
    ///
    /// Loaders record this as a skip; it never aborts a directory load.
    #[error("Decode failed: {}: {reason}", path.display())]
    Decode {
        /// Path to the file that failed to decode.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Paired images differ in shape for a referenced metric.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?} (height, width, channels)")]
    DimensionMismatch {
        /// Shape of the reference image.
        expected: Shape,
        /// Shape of the candidate image.
        actual: Shape,
    },

    /// Invalid metric or enhancement configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to calculate a quality metric.
    #[error("Metric calculation failed: {metric}: {reason}")]
    MetricCalculation {
        /// Name of the metric that failed.
        metric: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Failed to enhance or write an image.
    #[error("Enhancement failed: {}: {reason}", path.display())]
    Enhance {
        /// Path of the image being enhanced.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image codec error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

fn format_keys(keys: &[ImageKey]) -> String {
    let names: Vec<&str> = keys.iter().map(ImageKey::as_str).collect();
    format!("[{}]", names.join(", "))
}
