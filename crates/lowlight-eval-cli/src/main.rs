//! lowlight-eval CLI - paired image set evaluation and CLAHE enhancement

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lowlight_eval::MetricKind;
use tracing_subscriber::EnvFilter;

mod commands;

/// Evaluate low-light enhancement by comparing before/after image directories.
#[derive(Parser)]
#[command(name = "lowlight-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an output directory against its input directory
    Evaluate {
        /// Directory of original images
        #[arg(short, long, env = "LOWLIGHT_INPUT_DIR")]
        input: PathBuf,

        /// Directory of enhanced images
        #[arg(short, long, env = "LOWLIGHT_OUTPUT_DIR")]
        output: PathBuf,

        /// Metric to run (psnr, ssim, brisque, niqe); repeat for several, default all
        #[arg(short, long = "metric", value_parser = parse_metric)]
        metrics: Vec<MetricKind>,

        /// SSIM window size (odd, at least 3)
        #[arg(long, default_value_t = 3)]
        ssim_window: usize,

        /// Score images in parallel
        #[arg(long)]
        parallel: bool,

        /// Stop at the first image that fails to score
        #[arg(long)]
        strict: bool,

        /// Also score the input set with no-reference metrics and report deltas
        #[arg(long)]
        score_input: bool,

        /// Write <metric>.json and <metric>.csv into this directory
        #[arg(long, env = "LOWLIGHT_REPORT_DIR")]
        report_dir: Option<PathBuf>,
    },

    /// Enhance a directory of low-light images with CLAHE
    Enhance {
        /// Directory of original images
        #[arg(short, long, env = "LOWLIGHT_INPUT_DIR")]
        input: PathBuf,

        /// Directory to write enhanced images to
        #[arg(short, long, env = "LOWLIGHT_OUTPUT_DIR")]
        output: PathBuf,

        /// Contrast limit
        #[arg(long, default_value_t = 3.0)]
        clip_limit: f64,

        /// Tile grid as <cols>x<rows>
        #[arg(long, default_value = "8x8", value_parser = parse_tiles)]
        tiles: (usize, usize),

        /// Process images in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show how the two directories pair up, without scoring
    Pairs {
        /// Directory of original images
        #[arg(short, long, env = "LOWLIGHT_INPUT_DIR")]
        input: PathBuf,

        /// Directory of enhanced images
        #[arg(short, long, env = "LOWLIGHT_OUTPUT_DIR")]
        output: PathBuf,
    },
}

fn parse_metric(s: &str) -> Result<MetricKind, String> {
    s.parse::<MetricKind>().map_err(|e| e.to_string())
}

fn parse_tiles(s: &str) -> Result<(usize, usize), String> {
    let (cols, rows) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected <cols>x<rows>, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid tile count '{v}': {e}"))
    };
    Ok((parse(cols)?, parse(rows)?))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Evaluate {
            input,
            output,
            metrics,
            ssim_window,
            parallel,
            strict,
            score_input,
            report_dir,
        } => commands::evaluate::run(commands::evaluate::Args {
            input,
            output,
            metrics,
            ssim_window,
            parallel,
            strict,
            score_input,
            report_dir,
        }),
        Commands::Enhance {
            input,
            output,
            clip_limit,
            tiles,
            parallel,
        } => commands::enhance::run(input, output, clip_limit, tiles, parallel),
        Commands::Pairs { input, output } => commands::pairs::run(input, output),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
