//! Scenario runner that orchestrates one server per scenario

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};
use crate::executor::StepExecutor;
use crate::port::find_free_port;
use crate::readiness::wait_ready;
use crate::report;
use crate::scenario::{self, Scenario};
use crate::server::ServerHandle;

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// The server never became ready; no steps ran
    StartupFailed,
    StepFailed,
    /// The scenario file could not be loaded
    Malformed,
}

impl Outcome {
    fn from_error(err: &E2eError) -> Self {
        match err {
            E2eError::MalformedScenario { .. } => Outcome::Malformed,
            E2eError::PortUnavailable(_)
            | E2eError::ServerStartup(_)
            | E2eError::StartupTimeout { .. }
            | E2eError::Http(_) => Outcome::StartupFailed,
            _ => Outcome::StepFailed,
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub path: PathBuf,
    pub outcome: Outcome,
    pub steps_run: usize,
    pub steps_total: usize,
    pub duration_ms: u64,
    pub server_pid: Option<u32>,
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Result of running the suite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scenarios strictly one after another, each against a fresh server
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Scenario files to run, in lexicographic order
    pub fn scenario_paths(&self) -> Vec<PathBuf> {
        let mut paths = scenario::discover(&self.config.scenarios_dir);
        if let Some(filter) = &self.config.name_filter {
            paths.retain(|p| {
                p.file_stem()
                    .map(|s| s.to_string_lossy().contains(filter.as_str()))
                    .unwrap_or(false)
            });
        }
        paths
    }

    /// Fail early if the configured server binary does not exist
    pub fn check_server_binary(&self) -> E2eResult<()> {
        let binary = &self.config.server.binary_path;
        if !binary.is_file() {
            return Err(E2eError::ServerBinaryNotFound(binary.clone()));
        }
        Ok(())
    }

    /// Run every discovered scenario
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let paths = self.scenario_paths();
        self.run_paths(&paths).await
    }

    /// Run the given scenario files in order.
    ///
    /// A missing server binary fails before any scenario starts. With
    /// `fail_fast` the suite stops at the first failure; a malformed scenario
    /// stops it either way.
    pub async fn run_paths(&self, paths: &[PathBuf]) -> E2eResult<SuiteResult> {
        self.check_server_binary()?;

        let start = Instant::now();
        let mut results = Vec::new();
        let mut skipped = 0;

        info!("Running {} scenario(s)...", paths.len());

        for (i, path) in paths.iter().enumerate() {
            let result = self.run_scenario(path).await;
            let halt = !result.passed()
                && (self.config.fail_fast || result.outcome == Outcome::Malformed);
            results.push(result);

            if halt {
                skipped = paths.len() - i - 1;
                if skipped > 0 {
                    info!("Skipping {} remaining scenario(s)", skipped);
                }
                break;
            }
        }

        let passed = results.iter().filter(|r| r.passed()).count();
        let failed = results.len() - passed;

        Ok(SuiteResult {
            total: paths.len(),
            passed,
            failed,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        })
    }

    /// Load and run one scenario file
    pub async fn run_scenario(&self, path: &Path) -> ScenarioResult {
        let start = Instant::now();

        let scenario = match Scenario::from_file(path) {
            Ok(scenario) => scenario,
            Err(e) => {
                report::scenario_failed(&e);
                return ScenarioResult {
                    name: path.display().to_string(),
                    path: path.to_path_buf(),
                    outcome: Outcome::Malformed,
                    steps_run: 0,
                    steps_total: 0,
                    duration_ms: start.elapsed().as_millis() as u64,
                    server_pid: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let name = scenario.name();
        report::scenario_banner(&name);

        let mut steps_run = 0;
        let mut server_pid = None;
        let result = self
            .run_on_fresh_server(&scenario, &mut steps_run, &mut server_pid)
            .await;

        let (outcome, error) = match result {
            Ok(()) => {
                report::scenario_passed(&name);
                (Outcome::Passed, None)
            }
            Err(e) => {
                report::scenario_failed(&e);
                (Outcome::from_error(&e), Some(e.to_string()))
            }
        };

        ScenarioResult {
            name,
            path: path.to_path_buf(),
            outcome,
            steps_run,
            steps_total: scenario.steps.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            server_pid,
            error,
        }
    }

    /// Start a server, run the steps against it, and stop it on every path out
    async fn run_on_fresh_server(
        &self,
        scenario: &Scenario,
        steps_run: &mut usize,
        server_pid: &mut Option<u32>,
    ) -> E2eResult<()> {
        let port = find_free_port()?;
        let mut server = ServerHandle::start(&self.config.server, port)?;
        *server_pid = server.pid();

        let result = self.drive(&server, scenario, steps_run).await;

        if let Err(e) = server.stop().await {
            warn!("Failed to stop server cleanly: {}", e);
        }
        result
    }

    async fn drive(
        &self,
        server: &ServerHandle,
        scenario: &Scenario,
        steps_run: &mut usize,
    ) -> E2eResult<()> {
        let client = reqwest::Client::builder().build()?;

        debug!("Probing {} for readiness", server.base_url());
        let probe = &self.config.server.probe;
        if !wait_ready(&client, server.base_url(), probe).await {
            return Err(E2eError::StartupTimeout {
                base_url: server.base_url().to_string(),
                attempts: probe.max_retries,
            });
        }

        let executor = StepExecutor::new(client, server.base_url());
        for step in &scenario.steps {
            *steps_run += 1;
            let response = executor.execute(step).await?;
            response.verify(step)?;
        }

        Ok(())
    }

    /// Write suite results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<Option<PathBuf>> {
        let Some(output_dir) = &self.config.output_dir else {
            return Ok(None);
        };
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(Some(path))
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::json;

    fn runner_with(binary: PathBuf, scenarios_dir: PathBuf) -> TestRunner {
        TestRunner::with_config(RunnerConfig {
            server: ServerConfig {
                binary_path: binary,
                ..Default::default()
            },
            scenarios_dir,
            ..Default::default()
        })
    }

    #[test]
    fn outcome_classification() {
        let timeout = E2eError::StartupTimeout {
            base_url: String::new(),
            attempts: 20,
        };
        assert_eq!(Outcome::from_error(&timeout), Outcome::StartupFailed);

        let mismatch = E2eError::BodyMismatch {
            expected: json!({}),
            actual: json!([]),
        };
        assert_eq!(Outcome::from_error(&mismatch), Outcome::StepFailed);

        let malformed = E2eError::malformed("x.json", "bad");
        assert_eq!(Outcome::from_error(&malformed), Outcome::Malformed);
    }

    #[tokio::test]
    async fn missing_binary_aborts_before_any_scenario() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01.json"), r#"{"steps": []}"#).unwrap();

        let runner = runner_with(PathBuf::from("/nonexistent/echomill_server"), dir.path().into());
        let err = runner.run_all().await.unwrap_err();
        assert!(matches!(err, E2eError::ServerBinaryNotFound(_)));
    }

    #[test]
    fn name_filter_matches_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["01_status.json", "02_orders.json", "03_depth.json"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }

        let runner = TestRunner::with_config(RunnerConfig {
            scenarios_dir: dir.path().into(),
            name_filter: Some("orders".to_string()),
            ..Default::default()
        });
        let paths = runner.scenario_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("02_orders.json"));
    }

    #[test]
    fn results_are_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner::with_config(RunnerConfig {
            output_dir: Some(dir.path().join("out")),
            ..Default::default()
        });

        let suite = SuiteResult {
            total: 1,
            passed: 0,
            failed: 1,
            results: vec![ScenarioResult {
                name: "status".to_string(),
                path: PathBuf::from("01_status.json"),
                outcome: Outcome::StepFailed,
                steps_run: 1,
                steps_total: 2,
                duration_ms: 5,
                server_pid: Some(42),
                error: Some("Expected status 200, got 404".to_string()),
            }],
            ..Default::default()
        };

        let path = runner.write_results(&suite).unwrap().unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["failed"], 1);
        assert_eq!(written["results"][0]["outcome"], "step_failed");
        assert!(!suite.success());
    }

    #[test]
    fn no_output_dir_writes_nothing() {
        let runner = TestRunner::new();
        assert!(runner.write_results(&SuiteResult::default()).unwrap().is_none());
    }
}
