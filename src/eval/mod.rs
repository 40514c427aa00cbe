//! Evaluation session, batch scoring and report generation.
//!
//! - [`session::EvalSession`]: loads, validates and runs every configured metric
//! - [`session::EvalConfig`]: configuration for a run
//! - [`batch::BatchEvaluator`]: per-key scoring in sorted key order
//! - [`report`]: aggregated results and their text/JSON/CSV forms

pub mod batch;
pub mod report;
pub mod session;

pub use batch::{BatchEvaluator, BatchOptions, Evaluation, FailedKey, KeyOutcome, ScoreRecord};
pub use report::{EvalReport, RunStatus, SummaryStatistics, format_record};
pub use session::{EvalConfig, EvalConfigBuilder, EvalSession, SessionEvent};
