//! Runner configuration
//!
//! Defaults mirror the repository layout: the server binary under
//! `echomill/build`, the instruments file under `config/` and scenarios under
//! `e2etest/scenarios`. An optional TOML file can override any of them.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::E2eResult;

/// Readiness probe budget
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Attempts before giving up
    pub max_retries: u32,

    /// Fixed pause between attempts
    pub interval: Duration,

    /// Upper bound on a single `GET /status`
    pub request_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_retries: 20,
            interval: Duration::from_millis(100),
            request_timeout: Duration::from_millis(100),
        }
    }
}

/// Configuration for spawning the server under test
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the echomill_server binary
    pub binary_path: PathBuf,

    /// Instruments file passed as the second positional argument
    pub instruments_path: PathBuf,

    /// Readiness probe settings
    pub probe: ProbeConfig,

    /// Grace period between SIGTERM and SIGKILL
    pub stop_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("echomill/build/src/echomill_server"),
            instruments_path: PathBuf::from("config/instruments.json"),
            probe: ProbeConfig::default(),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerConfig,

    /// Directory scanned for `*.json` scenario files
    pub scenarios_dir: PathBuf,

    /// Stop at the first failing scenario
    pub fail_fast: bool,

    /// Only run scenarios whose file stem contains this string
    pub name_filter: Option<String>,

    /// Where `test-results.json` is written, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scenarios_dir: PathBuf::from("e2etest/scenarios"),
            fail_fast: true,
            name_filter: None,
            output_dir: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file, falling back to defaults if it is absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        let mut config = Self::default();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let file: FileConfig = toml::from_str(&content)?;
            file.apply(&mut config);
        }
        Ok(config)
    }
}

/// On-disk shape of the config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    scenarios_dir: Option<PathBuf>,
    fail_fast: Option<bool>,
    output_dir: Option<PathBuf>,
    #[serde(default)]
    server: FileServerConfig,
    #[serde(default)]
    probe: FileProbeConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileServerConfig {
    binary_path: Option<PathBuf>,
    instruments_path: Option<PathBuf>,
    stop_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileProbeConfig {
    max_retries: Option<u32>,
    interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

impl FileConfig {
    fn apply(self, config: &mut RunnerConfig) {
        if let Some(dir) = self.scenarios_dir {
            config.scenarios_dir = dir;
        }
        if let Some(fail_fast) = self.fail_fast {
            config.fail_fast = fail_fast;
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }
        if let Some(path) = self.server.binary_path {
            config.server.binary_path = path;
        }
        if let Some(path) = self.server.instruments_path {
            config.server.instruments_path = path;
        }
        if let Some(ms) = self.server.stop_timeout_ms {
            config.server.stop_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = self.probe.max_retries {
            config.server.probe.max_retries = retries;
        }
        if let Some(ms) = self.probe.interval_ms {
            config.server.probe.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.probe.request_timeout_ms {
            config.server.probe.request_timeout = Duration::from_millis(ms);
        }
    }
}
