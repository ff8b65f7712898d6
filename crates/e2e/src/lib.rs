//! EchoMill E2E Test Framework
//!
//! This crate drives the EchoMill matching engine as a black box:
//! - Allocates a free port and spawns the server as a subprocess
//! - Streams the server's output while the scenario runs
//! - Waits for `GET /status` before issuing any step
//! - Executes declarative JSON scenarios step by step over HTTP
//! - Checks each response against an expected status and body subset
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── find_free_port() -> u16                              │
//! │    ├── ServerHandle::start() / stop()                       │
//! │    ├── wait_ready(base_url, probe) -> bool                  │
//! │    ├── StepExecutor::execute(step) -> StepResponse          │
//! │    └── subset_match(expected, actual) -> bool               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (JSON)                                            │
//! │    ├── meta: { name }                                       │
//! │    └── steps: [Step]                                        │
//! │          ├── name                                           │
//! │          ├── action: "<METHOD> <path>"                      │
//! │          ├── body?                                          │
//! │          ├── expect_status (default 200)                    │
//! │          └── expect_body?                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod port;
pub mod readiness;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod server;

pub use config::{ProbeConfig, RunnerConfig, ServerConfig};
pub use error::{E2eError, E2eResult};
pub use runner::{Outcome, ScenarioResult, SuiteResult, TestRunner};
pub use scenario::{Scenario, Step};
