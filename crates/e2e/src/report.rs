//! Console reporting

use colored::Colorize;

use crate::error::E2eError;
use crate::runner::SuiteResult;

pub fn scenario_banner(name: &str) {
    println!("\n{} {}", "> Running Scenario:".blue().bold(), name.white().bold());
}

pub fn scenario_passed(name: &str) {
    println!("  {} {}", "PASSED:".green().bold(), name);
}

/// Print a scenario failure with enough context to diagnose it
pub fn scenario_failed(err: &E2eError) {
    for line in failure_lines(err) {
        println!("{}", line);
    }
}

fn failure_lines(err: &E2eError) -> Vec<String> {
    let failed = "FAILED:".red().bold();

    if err.is_assertion() {
        let mut lines = vec![format!("    {} {}", failed, err)];
        match err {
            E2eError::StatusMismatch { body, .. } => {
                lines.push(format!("    Response: {}", body));
            }
            E2eError::BodyMismatch { expected, actual } => {
                lines.push(format!("      Expected (subset): {}", expected));
                lines.push(format!("      Actual: {}", actual));
            }
            _ => {}
        }
        return lines;
    }

    match err {
        E2eError::Transport(_) => vec![format!("    {} {}", failed, err)],
        E2eError::PortUnavailable(_)
        | E2eError::ServerStartup(_)
        | E2eError::StartupTimeout { .. } => {
            vec![format!("  {} Could not start server. {}", failed, err)]
        }
        other => vec![format!("  {} {}", failed, other)],
    }
}

pub fn suite_summary(results: &SuiteResult) {
    println!(
        "\nResults: {} passed, {} failed, {} skipped ({} ms)",
        results.passed, results.failed, results.skipped, results.duration_ms
    );

    if results.success() {
        println!("{}", "ALL SCENARIOS PASSED!".green().bold());
    } else {
        println!("{}", "SCENARIO FAILED.".red().bold());
    }
}
