use std::collections::BTreeSet;

use crate::error::{HarnessError, Result};
use crate::http::RequestTemplate;
use crate::testing::Assertion;

/// Store the response value at `path` under `key` once the case passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateWrite {
    pub key: String,
    pub path: String,
}

/// One independently reportable scenario. Cases run in ascending `order`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub id: String,
    pub order: u32,
    pub request: RequestTemplate,
    pub assertions: Vec<Assertion>,
    pub writes: Vec<StateWrite>,
    /// Keys the case needs beyond those its template already references.
    pub depends_on: BTreeSet<String>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, order: u32, request: RequestTemplate) -> Self {
        Self {
            id: id.into(),
            order,
            request,
            assertions: Vec::new(),
            writes: Vec::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn expect(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn writes(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.writes.push(StateWrite {
            key: key.into(),
            path: path.into(),
        });
        self
    }

    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.depends_on.insert(key.into());
        self
    }

    /// Every shared-state key this case reads.
    pub fn reads(&self) -> Result<BTreeSet<String>> {
        let mut keys = self.request.state_keys()?;
        keys.extend(self.depends_on.iter().cloned());
        Ok(keys)
    }

    pub fn produces(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|write| write.key.as_str())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(HarnessError::config("Case id cannot be empty"));
        }
        self.request
            .validate()
            .map_err(|e| HarnessError::config(format!("case `{}`: {e}", self.id)))?;

        for write in &self.writes {
            if write.key.trim().is_empty() {
                return Err(HarnessError::config(format!(
                    "case `{}` writes an empty state key",
                    self.id
                )));
            }
        }

        let reads = self.reads()?;
        if let Some(key) = self.produces().find(|key| reads.contains(*key)) {
            return Err(HarnessError::config(format!(
                "case `{}` reads `{key}` which it writes itself",
                self.id
            )));
        }
        Ok(())
    }
}
