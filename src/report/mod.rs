//! # Run Report
//!
//! Ordered per-case outcomes of one run plus the summary used for console
//! output and the process exit code.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, HarnessError, Result};
use crate::testing::AssertionResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { failures: Vec<AssertionResult> },
    Errored { kind: ErrorKind, message: String },
}

impl Outcome {
    pub fn errored(err: &HarnessError) -> Self {
        Outcome::Errored {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Errored { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Errored { .. } => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub id: String,
    pub order: u32,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub attempts: u32,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub cases: Vec<CaseReport>,
    /// Set when the run stopped early (deadline or interrupt).
    pub cancelled: bool,
    pub not_run: Vec<String>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            cases: Vec::new(),
            cancelled: false,
            not_run: Vec::new(),
        }
    }

    pub fn case(&self, id: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.id == id)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.cases.len(),
            ..Default::default()
        };
        for case in &self.cases {
            match case.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed { .. } => summary.failed += 1,
                Outcome::Errored { .. } => summary.errored += 1,
            }
        }
        summary
    }

    pub fn success(&self) -> bool {
        !self.cancelled && self.cases.iter().all(|case| case.outcome.is_passed())
    }

    pub fn exit_code(&self) -> u8 {
        if self.success() { 0 } else { 1 }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for case in &self.cases {
            let _ = writeln!(
                out,
                "{:<5} [{}] {} ({} ms)",
                case.outcome.label(),
                case.order,
                case.id,
                case.duration_ms
            );
            for message in &case.messages {
                let _ = writeln!(out, "      {message}");
            }
        }
        for id in &self.not_run {
            let _ = writeln!(out, "SKIP  {id} (not run)");
        }

        let summary = self.summary();
        let _ = write!(
            out,
            "{} cases: {} passed, {} failed, {} errored in {} ms",
            summary.total, summary.passed, summary.failed, summary.errored, self.duration_ms
        );
        if self.cancelled {
            let _ = write!(out, " (cancelled, {} not run)", self.not_run.len());
        }
        out.push('\n');
        out
    }
}
