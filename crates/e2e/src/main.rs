//! EchoMill E2E runner
//!
//! Runs every scenario under the scenarios directory against a fresh server
//! process and exits 0 only if all of them pass.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use echomill_e2e::{report, E2eResult, RunnerConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "echomill-e2e")]
#[command(about = "Scenario-driven E2E tests for the EchoMill server")]
#[command(version)]
struct Args {
    /// Configuration file (ignored if it does not exist)
    #[arg(short, long, default_value = "e2etest/echomill-e2e.toml")]
    config: PathBuf,

    /// Path to the server binary
    #[arg(long)]
    server_binary: Option<PathBuf>,

    /// Instruments file passed to the server
    #[arg(long)]
    instruments: Option<PathBuf>,

    /// Directory containing *.json scenarios
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios whose file name contains this string
    #[arg(short, long)]
    name: Option<String>,

    /// Keep running after a failed scenario
    #[arg(long)]
    keep_going: bool,

    /// Directory for test-results.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = match rt.block_on(async_main(args)) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    drop(rt);
    std::process::exit(code);
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = RunnerConfig::load(&args.config)?;

    if let Some(path) = args.server_binary {
        config.server.binary_path = path;
    }
    if let Some(path) = args.instruments {
        config.server.instruments_path = path;
    }
    if let Some(dir) = args.scenarios {
        config.scenarios_dir = dir;
    }
    if args.keep_going {
        config.fail_fast = false;
    }
    if args.name.is_some() {
        config.name_filter = args.name;
    }
    if args.output.is_some() {
        config.output_dir = args.output;
    }

    let runner = TestRunner::with_config(config);
    runner.check_server_binary()?;

    let paths = runner.scenario_paths();
    if paths.is_empty() {
        println!("No scenarios found.");
        return Ok(true);
    }

    let results = runner.run_paths(&paths).await?;
    report::suite_summary(&results);
    runner.write_results(&results)?;

    Ok(results.success())
}
