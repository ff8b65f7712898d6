//! Error types for E2E testing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Could not obtain a free port: {0}")]
    PortUnavailable(#[source] std::io::Error),

    #[error("Server binary not found at {}", .0.display())]
    ServerBinaryNotFound(PathBuf),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server not ready at {base_url} after {attempts} attempts")]
    StartupTimeout { base_url: String, attempts: u32 },

    #[error("Request error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Expected status {expected}, got {actual}")]
    StatusMismatch {
        expected: u16,
        actual: u16,
        body: serde_json::Value,
    },

    #[error("Body mismatch")]
    BodyMismatch {
        expected: serde_json::Value,
        actual: serde_json::Value,
    },

    #[error("Malformed scenario {}: {reason}", .path.display())]
    MalformedScenario { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// True for failures where the server answered but not as expected.
    /// The reporter prints the expected and actual values for these.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::StatusMismatch { .. } | Self::BodyMismatch { .. })
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedScenario {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
