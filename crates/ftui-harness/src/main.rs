#![forbid(unsafe_code)]

//! Replay an overlay scenario and print its trace.
//!
//! # Running
//!
//! ```sh
//! cargo run -p ftui-harness -- scenario.json
//! cargo run -p ftui-harness -- scenario.json --out trace.jsonl
//! RUST_LOG=ftui_overlay=debug cargo run -p ftui-harness -- scenario.json
//! ```
//!
//! The JSONL trace goes to stdout (or `--out`); logs go to stderr. The last
//! line on stderr is the blake3 digest of the trace.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use ftui_harness::{Scenario, ScenarioError, run_scenario};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const USAGE: &str = "usage: ftui-harness <scenario.json> [--out <trace.jsonl>]";

struct Args {
    scenario: PathBuf,
    out: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut args = std::env::args_os().skip(1);
    let mut scenario = None;
    let mut out = None;
    while let Some(arg) = args.next() {
        if arg == "--out" {
            out = Some(PathBuf::from(args.next()?));
        } else if arg == "-h" || arg == "--help" {
            return None;
        } else if scenario.is_none() {
            scenario = Some(PathBuf::from(arg));
        } else {
            return None;
        }
    }
    Some(Args {
        scenario: scenario?,
        out,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ftui_harness=info,ftui_overlay=warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

fn run(args: &Args) -> Result<String, ScenarioError> {
    let scenario = Scenario::from_json_file(&args.scenario)?;
    info!(name = %scenario.name, steps = scenario.steps.len(), "running scenario");
    let trace = run_scenario(&scenario)?;
    match &args.out {
        Some(path) => trace.write_jsonl(BufWriter::new(File::create(path)?))?,
        None => trace.write_jsonl(io::stdout().lock())?,
    }
    Ok(trace.digest())
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    init_tracing();

    match run(&args) {
        Ok(digest) => {
            eprintln!("{digest}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, path = %args.scenario.display(), "scenario failed");
            ExitCode::FAILURE
        }
    }
}
