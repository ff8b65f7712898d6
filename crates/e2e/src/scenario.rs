//! Declarative JSON scenario files

use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub meta: Meta,

    /// Steps to execute in file order
    pub steps: Vec<Step>,

    /// File the scenario was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// A single HTTP interaction
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default = "default_step_name")]
    pub name: String,

    /// Request line, e.g. `POST /orders`
    pub action: Action,

    /// JSON payload sent with the request
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    #[serde(default = "default_expect_status")]
    pub expect_status: u16,

    /// Subset the response body must contain.
    ///
    /// Any non-null value is checked, including `{}` and `[]`: `{}` requires
    /// an object body and `[]` an empty array.
    #[serde(default)]
    pub expect_body: Option<serde_json::Value>,
}

fn default_step_name() -> String {
    "Unnamed step".to_string()
}

fn default_expect_status() -> u16 {
    200
}

/// HTTP method and absolute path of a step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Action {
    pub method: Method,
    pub path: String,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (method, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), None) => (method, path),
            _ => return Err(format!("action '{}' must be '<METHOD> <path>'", s)),
        };

        if !method.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(format!("action '{}' has invalid method '{}'", s, method));
        }
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| format!("action '{}' has invalid method '{}'", s, method))?;

        if !path.starts_with('/') {
            return Err(format!("action '{}' path must start with '/'", s));
        }

        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl Scenario {
    /// Parse a scenario from a JSON string
    pub fn from_json(json: &str, path: &Path) -> E2eResult<Self> {
        let mut scenario: Self =
            serde_json::from_str(json).map_err(|e| E2eError::malformed(path, e))?;
        scenario.path = path.to_path_buf();
        Ok(scenario)
    }

    /// Parse a scenario from a JSON file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| E2eError::malformed(path, e))?;
        Self::from_json(&content, path)
    }

    /// Display name, falling back to the file name
    pub fn name(&self) -> String {
        match &self.meta.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.display().to_string()),
        }
    }
}

/// List `*.json` files directly inside `dir`, sorted by file name
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!("Scenario directory {} does not exist", dir.display());
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}
