//! Enhance command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use lowlight_eval::{ClaheParams, EvalConfig, EvalSession};
use tracing::debug;

pub fn run(
    input: PathBuf,
    output: PathBuf,
    clip_limit: f64,
    tiles: (usize, usize),
    parallel: bool,
) -> Result<ExitCode> {
    let config = EvalConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .clahe(ClaheParams { clip_limit, tiles })
        .parallel(parallel)
        .build()
        .context("Invalid enhancement settings")?;
    debug!(?config, "enhancement settings");
    let params = config.clahe;

    println!(
        "Enhancing {} -> {} (clip limit {}, tiles {}x{})",
        input.display(),
        output.display(),
        params.clip_limit,
        params.tiles.0,
        params.tiles.1
    );

    let summary = EvalSession::new(config)
        .enhance()
        .with_context(|| format!("Failed to enhance {}", input.display()))?;

    let total = summary.written.len() + summary.failed.len();
    if total == 0 {
        println!("No images found to enhance.");
    }
    for (idx, path) in summary.written.iter().enumerate() {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("[{}/{}] {}", idx + 1, total, name);
    }

    if !summary.failed.is_empty() {
        println!("Failed ({}):", summary.failed.len());
        for failed in &summary.failed {
            println!("  {}: {}", failed.path.display(), failed.reason);
        }
    }
    if !summary.skipped.is_empty() {
        println!("Skipped ({}):", summary.skipped.len());
        for skipped in &summary.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    println!("Enhanced {} of {} images.", summary.written.len(), total);
    Ok(ExitCode::SUCCESS)
}
