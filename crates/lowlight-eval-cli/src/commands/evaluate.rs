//! Evaluate command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use lowlight_eval::eval::{EvalReport, KeyOutcome, RunStatus, SessionEvent, format_record};
use lowlight_eval::{EvalConfig, EvalSession, MetricKind};
use tracing::debug;

/// Exit code when some metric produced no scores at all.
const EXIT_NO_DATA: u8 = 2;

pub struct Args {
    pub input: PathBuf,
    pub output: PathBuf,
    pub metrics: Vec<MetricKind>,
    pub ssim_window: usize,
    pub parallel: bool,
    pub strict: bool,
    pub score_input: bool,
    pub report_dir: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<ExitCode> {
    let mut builder = EvalConfig::builder()
        .input_dir(&args.input)
        .output_dir(&args.output)
        .metrics(args.metrics)
        .ssim_window_size(args.ssim_window)
        .parallel(args.parallel)
        .strict(args.strict)
        .score_input_set(args.score_input);
    if let Some(dir) = &args.report_dir {
        builder = builder.report_dir(dir);
    }
    let config = builder.build().context("Invalid evaluation settings")?;
    debug!(?config, "evaluation settings");

    let session = EvalSession::new(config);
    let reports = session
        .run_with(|event| match event {
            SessionEvent::Key { metric, outcome } => match outcome {
                KeyOutcome::Scored(record) => println!("{}", format_record(metric, record)),
                KeyOutcome::Failed(failure) => {
                    println!("{}: {} failed ({})", failure.key, metric.name, failure.reason);
                }
            },
            SessionEvent::Finished(report) => {
                println!();
                print!("{}", report.render_summary());
                println!();
            }
        })
        .with_context(|| {
            format!(
                "Failed to evaluate {} against {}",
                args.output.display(),
                args.input.display()
            )
        })?;

    if let Some(first) = reports.first() {
        print_loader_notes(first);
    }
    if let Some(dir) = &args.report_dir {
        println!("Reports written to: {}", dir.display());
    }

    Ok(ExitCode::from(exit_status(&reports)))
}

fn print_loader_notes(report: &EvalReport) {
    if !report.skipped.is_empty() {
        println!("Skipped files ({}):", report.skipped.len());
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
    if !report.collisions.is_empty() {
        println!("Key collisions ({}):", report.collisions.len());
        for collision in &report.collisions {
            println!(
                "  {}: kept {}, replaced {}",
                collision.key,
                collision.kept.display(),
                collision.replaced.display()
            );
        }
    }
}

fn exit_status(reports: &[EvalReport]) -> u8 {
    if reports.iter().any(|r| r.status() == RunStatus::NoData) {
        EXIT_NO_DATA
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowlight_eval::eval::{Evaluation, FailedKey, ScoreRecord};
    use lowlight_eval::{ImageKey, MetricAdapter, MetricConfig};

    fn report(records: usize, failures: usize) -> EvalReport {
        let config = EvalConfig::builder()
            .input_dir("low")
            .output_dir("high")
            .build()
            .unwrap();
        let info = MetricAdapter::new(MetricKind::Psnr, &MetricConfig::default())
            .unwrap()
            .info();
        let evaluation = Evaluation {
            records: (0..records)
                .map(|i| ScoreRecord {
                    key: ImageKey::from(format!("k_{i}")),
                    score: 30.0,
                    baseline: None,
                    delta: None,
                })
                .collect(),
            failures: (0..failures)
                .map(|i| FailedKey {
                    key: ImageKey::from(format!("f_{i}")),
                    reason: "dimension mismatch".to_string(),
                })
                .collect(),
        };
        EvalReport::new(info, evaluation, config)
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&[report(2, 0)]), 0);
        // Degraded runs still succeed.
        assert_eq!(exit_status(&[report(2, 1)]), 0);
        assert_eq!(exit_status(&[report(2, 0), report(0, 2)]), EXIT_NO_DATA);
        assert_eq!(exit_status(&[report(0, 0)]), EXIT_NO_DATA);
    }
}
