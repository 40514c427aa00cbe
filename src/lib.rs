//! # lowlight-eval
//!
//! Paired before/after image set evaluation.
//!
//! Two directories are loaded into [`ImageSet`]s keyed by a name-derived
//! [`ImageKey`], checked for exact key correspondence, and scored per key
//! with PSNR, SSIM, simplified BRISQUE and simplified NIQE. Scores are
//! aggregated into mean, sample standard deviation and count. A CLAHE
//! enhancer produces the "after" directory from the "before" one.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lowlight_eval::{EvalConfig, EvalSession, MetricKind};
//!
//! let config = EvalConfig::builder()
//!     .input_dir("./low")
//!     .output_dir("./enhanced")
//!     .metric(MetricKind::Psnr)
//!     .metric(MetricKind::Ssim)
//!     .build()?;
//!
//! for report in EvalSession::new(config).run()? {
//!     print!("{}", report.render());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`corpus`]: Image set loading and key correspondence
//! - [`metrics`]: Metric strategies and the uniform adapter
//! - [`eval`]: Batch evaluation, sessions and reports
//! - [`stats`]: Descriptive statistics
//! - [`enhance`]: CLAHE low-light enhancement

pub mod corpus;
pub mod enhance;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod stats;

// Re-export commonly used types
pub use corpus::{ImageKey, ImageSet, KeyCollision, LoadedImage, SkippedFile};
pub use enhance::{ClaheParams, EnhanceSummary, enhance_directory, enhance_image};
pub use error::{Error, Result};
pub use eval::{
    batch::{BatchEvaluator, BatchOptions, Evaluation, FailedKey, KeyOutcome, ScoreRecord},
    report::{EvalReport, RunStatus, SummaryStatistics},
    session::{EvalConfig, EvalSession, SessionEvent},
};
pub use metrics::{MetricAdapter, MetricConfig, MetricInfo, MetricKind, ScoreDirection};
pub use stats::Summary;
