//! # Configuration
//!
//! Settings loaded once before a run starts: target base URL, default
//! credentials and content type, per-request timeout, fixture seed and
//! run-level deadline. Values come from an optional JSON file; every field
//! has a default so a partial file (or none at all) is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthMode;
use crate::error::{HarnessError, Result};
use crate::sequencer::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://restful-booker.herokuapp.com";
const DEFAULT_CONTENT_TYPE: &str = "application/json";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "password123".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// When set, requests default to bearer auth instead of Basic.
    pub bearer_token: Option<String>,
    pub content_type: String,
    pub accept: Option<String>,
    pub timeout_ms: u64,
    pub seed: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub schema_dir: Option<PathBuf>,
    pub retry: Option<RetryPolicy>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            credentials: Credentials::default(),
            bearer_token: None,
            content_type: DEFAULT_CONTENT_TYPE.into(),
            accept: Some(DEFAULT_CONTENT_TYPE.into()),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            seed: None,
            deadline_secs: None,
            schema_dir: None,
            retry: None,
        }
    }
}

impl HarnessConfig {
    /// Read a JSON config file. A missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!("Failed to read config file `{}`: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            HarnessError::config(format!("Failed to parse config file `{}`: {e}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| HarnessError::config(format!("Invalid base URL `{}`: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarnessError::config(format!(
                "Base URL `{}` must use http or https",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(HarnessError::config("timeout_ms must be greater than zero"));
        }
        if self.content_type.trim().is_empty() {
            return Err(HarnessError::config("content_type cannot be empty"));
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        self.default_auth().validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn default_auth(&self) -> AuthMode {
        match &self.bearer_token {
            Some(token) => AuthMode::Bearer {
                token: token.clone(),
            },
            None => AuthMode::basic(&self.credentials.username, &self.credentials.password),
        }
    }
}
