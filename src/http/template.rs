use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::method::HttpMethod;
use super::request::Body;
use crate::auth::AuthMode;
use crate::error::{HarnessError, Result};
use crate::state::{self, SharedState};

/// Declarative description of a request. Path, query values, header values
/// and body strings may reference shared state with `{{key}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    /// Overrides the configured default auth when set.
    pub auth: Option<AuthMode>,
    /// Overrides the configured default content type when set.
    pub content_type: Option<String>,
}

impl RequestTemplate {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            auth: None,
            content_type: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Serialize a typed fixture as the JSON body.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| HarnessError::config(format!("Failed to serialize request body: {e}")))?;
        Ok(self.json_value(value))
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Structural checks that do not need shared state.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(HarnessError::config(format!(
                "Path `{}` must start with `/`",
                self.path
            )));
        }

        let mut seen = BTreeSet::new();
        for (name, _) in &self.headers {
            let name = name.trim();
            if name.is_empty() {
                return Err(HarnessError::config("Header name cannot be empty"));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(HarnessError::config(format!("Duplicate header `{name}`")));
            }
        }

        for (key, _) in &self.query {
            if key.trim().is_empty() {
                return Err(HarnessError::config("Query key cannot be empty"));
            }
        }

        if let Some(auth) = &self.auth {
            auth.validate()?;
        }

        // Surfaces unclosed or empty placeholders.
        self.state_keys().map(|_| ())
    }

    /// Every shared-state key the template reads, auth included.
    pub fn state_keys(&self) -> Result<BTreeSet<String>> {
        let mut keys = state::placeholders(&self.path)?;
        for (_, value) in self.query.iter().chain(&self.headers) {
            keys.extend(state::placeholders(value)?);
        }
        match &self.body {
            Some(Body::Json(value)) => collect_json_keys(value, &mut keys)?,
            Some(Body::Text(text)) => keys.extend(state::placeholders(text)?),
            None => {}
        }
        if let Some(auth) = &self.auth {
            keys.extend(auth.state_keys()?);
        }
        Ok(keys)
    }
}

fn collect_json_keys(value: &Value, keys: &mut BTreeSet<String>) -> Result<()> {
    match value {
        Value::String(text) => keys.extend(state::placeholders(text)?),
        Value::Array(items) => {
            for item in items {
                collect_json_keys(item, keys)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_json_keys(item, keys)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Interpolate every string inside a JSON document.
pub(crate) fn interpolate_json(value: &Value, state: &SharedState) -> Result<Value> {
    Ok(match value {
        Value::String(text) => Value::String(state.interpolate(text)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_json(item, state))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| Ok((key.clone(), interpolate_json(item, state)?)))
                .collect::<Result<_>>()?,
        ),
        other => other.clone(),
    })
}
