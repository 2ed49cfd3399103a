//! # CLI
//!
//! Command-line entry for running suites in CI pipelines, e.g.
//! `getman-check run --base-url http://localhost:3001 --report out/run.json`.
//! Exit code is 0 when every case passed, 1 otherwise, 2 when the run could
//! not start.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::sequencer::RetryPolicy;

#[derive(Debug, Parser)]
#[command(author, version, about = "Run API test suites against a REST service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the booking suite.
    Run(RunArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// JSON config file; CLI flags override its values.
    #[arg(long, env = "GETMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the service under test.
    #[arg(long, env = "GETMAN_BASE_URL")]
    pub base_url: Option<String>,

    /// Seed for fixture generation; random when omitted.
    #[arg(long, env = "GETMAN_SEED")]
    pub seed: Option<u64>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Stop starting new cases after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Load schemas from this directory instead of the embedded ones.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Retry cases whose only failures are latency checks, up to N attempts.
    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long, env = "GETMAN_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl RunArgs {
    /// Load the config file (if any) and apply flag overrides.
    pub fn resolve_config(&self) -> Result<HarnessConfig> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if self.deadline_secs.is_some() {
            config.deadline_secs = self.deadline_secs;
        }
        if self.schema_dir.is_some() {
            config.schema_dir = self.schema_dir.clone();
        }
        if let Some(max_attempts) = self.retries {
            config.retry = Some(RetryPolicy {
                max_attempts,
                ..config.retry.clone().unwrap_or_default()
            });
        }

        config.validate()?;
        Ok(config)
    }
}
