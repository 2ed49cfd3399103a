use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Check applied to the value found at a JSON path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    Exists,
    Equals(Value),
    SizeEquals(usize),
    SizeGreaterThan(usize),
    NotEmpty,
}

/// A single declarative check against a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Status(u16),
    /// Compared on the media type only; parameters such as `charset` are ignored.
    ContentType(String),
    /// Body must match the JSON schema registered under this name.
    Schema(String),
    Field { path: String, check: FieldCheck },
    /// Elapsed time must be strictly below the bound. Environment dependent,
    /// so it counts as a soft check for retries.
    LatencyBelow(Duration),
}

impl Assertion {
    pub fn status(code: u16) -> Self {
        Assertion::Status(code)
    }

    pub fn content_type(media_type: impl Into<String>) -> Self {
        Assertion::ContentType(media_type.into())
    }

    pub fn json() -> Self {
        Assertion::ContentType("application/json".into())
    }

    pub fn schema(name: impl Into<String>) -> Self {
        Assertion::Schema(name.into())
    }

    pub fn field(path: impl Into<String>, check: FieldCheck) -> Self {
        Assertion::Field {
            path: path.into(),
            check,
        }
    }

    pub fn latency_below(millis: u64) -> Self {
        Assertion::LatencyBelow(Duration::from_millis(millis))
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Assertion::LatencyBelow(_))
    }
}

impl Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Status(code) => write!(f, "status is {code}"),
            Assertion::ContentType(media_type) => write!(f, "content type is {media_type}"),
            Assertion::Schema(name) => write!(f, "body matches schema `{name}`"),
            Assertion::Field { path, check } => match check {
                FieldCheck::Exists => write!(f, "`{path}` exists"),
                FieldCheck::Equals(value) => write!(f, "`{path}` equals {value}"),
                FieldCheck::SizeEquals(size) => write!(f, "`{path}` has size {size}"),
                FieldCheck::SizeGreaterThan(size) => write!(f, "`{path}` has size > {size}"),
                FieldCheck::NotEmpty => write!(f, "`{path}` is not empty"),
            },
            Assertion::LatencyBelow(bound) => write!(f, "latency < {} ms", bound.as_millis()),
        }
    }
}

/// Outcome of one assertion. `expected`/`actual` form the diff shown on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub description: String,
    pub passed: bool,
    pub soft: bool,
    pub expected: String,
    pub actual: String,
}

impl AssertionResult {
    pub fn message(&self) -> String {
        if self.passed {
            format!("{}: ok", self.description)
        } else {
            format!(
                "{}: expected {}, got {}",
                self.description, self.expected, self.actual
            )
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<AssertionResult>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|result| result.passed)
    }

    pub fn failures(&self) -> Vec<AssertionResult> {
        self.results
            .iter()
            .filter(|result| !result.passed)
            .cloned()
            .collect()
    }
}

/// True when there is at least one failure and every one is a soft check.
pub fn only_soft(failures: &[AssertionResult]) -> bool {
    !failures.is_empty() && failures.iter().all(|failure| failure.soft)
}
