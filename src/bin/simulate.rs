//! Rotation simulator CLI.
//!
//! Loads a run request from JSON, runs the trials and prints the report.
//!
//! Usage:
//!   cargo run --bin simulate -- <REQUEST.json> [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate -- mage.json                 # Request as written
//!   cargo run --bin simulate -- mage.json -n 100 -s 42    # 100 reproducible trials
//!   cargo run --bin simulate -- mage.json --targets 3 -p  # Three targets, parallel

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use raidsim::simulator::{Harness, RunRequest, TargetConfig};
use raidsim::utils::init_logging;

#[derive(Parser)]
#[command(
    name = "simulate",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
)]
struct Args {
    /// Run request file (JSON)
    request: PathBuf,

    /// Number of trials
    #[arg(short = 'n', long = "runs")]
    runs: Option<u32>,

    /// Base RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Encounter length in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Number of targets; extra targets copy the first one
    #[arg(short, long)]
    targets: Option<usize>,

    /// Run trials in parallel
    #[arg(short, long)]
    parallel: bool,

    /// Keep per-trial cast logs in the JSON report
    #[arg(long)]
    diagnostics: bool,

    /// Save the report as JSON
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let request = match load_request(&args) {
        Ok(request) => request,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                 RAIDSIM ROTATION SIMULATOR                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!("  Player:         {}", request.player.name);
    println!("  Spells:         {}", request.spells.len());
    println!("  Trials:         {}", request.iterations);
    println!("  Duration:       {:.1}s", request.encounter.duration_secs);
    println!("  Targets:        {}", request.encounter.targets.len());
    println!("  Parallel:       {}", request.parallel);
    if let Some(seed) = request.seed {
        println!("  Seed:           {}", seed);
    }
    println!();

    let harness = match Harness::new(request) {
        Ok(harness) => harness,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("Running simulation...");
    println!();

    let report = match harness.run() {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("{}", report.to_text());

    if args.json {
        let filename = format!(
            "sim_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        if let Err(err) = std::fs::write(&filename, report.to_json()) {
            eprintln!("error: failed to write {filename}: {err}");
            return ExitCode::FAILURE;
        }
        println!("JSON report saved to: {}", filename);
    }
    ExitCode::SUCCESS
}

/// Read the request file and apply command-line overrides.
fn load_request(args: &Args) -> Result<RunRequest, String> {
    let text = std::fs::read_to_string(&args.request)
        .map_err(|e| format!("cannot read {}: {e}", args.request.display()))?;
    let mut request: RunRequest = serde_json::from_str(&text)
        .map_err(|e| format!("cannot parse {}: {e}", args.request.display()))?;

    if let Some(runs) = args.runs {
        request.iterations = runs;
    }
    if args.seed.is_some() {
        request.seed = args.seed;
    }
    if let Some(duration) = args.duration {
        request.encounter.duration_secs = duration;
    }
    if let Some(count) = args.targets {
        let template = request.encounter.targets.first().cloned().unwrap_or_default();
        let mut next = request.encounter.targets.len();
        request.encounter.targets.resize_with(count, || {
            next += 1;
            TargetConfig {
                name: format!("{} {next}", template.name),
                ..template.clone()
            }
        });
    }
    request.parallel |= args.parallel;
    request.diagnostics |= args.diagnostics;
    Ok(request)
}
