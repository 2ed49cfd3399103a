//! # Shared State
//!
//! Run-scoped key/value store used to pass data (tokens, created ids) from
//! earlier cases to later ones. Templates reference entries with
//! `{{key}}` placeholders.
//!
//! Unlike plain variable interpolation, resolution is strict: a placeholder
//! whose key is absent fails with [`HarnessError::MissingState`] instead of
//! being left in place.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{HarnessError, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedState {
    values: BTreeMap<String, String>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| HarnessError::MissingState {
            key: key.to_string(),
        })
    }

    /// Replace every `{{key}}` in `text` with its stored value.
    pub fn interpolate(&self, text: &str) -> Result<String> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some((before, key, after)) = next_placeholder(rest)? {
            result.push_str(before);
            result.push_str(self.require(key)?);
            rest = after;
        }
        result.push_str(rest);

        Ok(result)
    }
}

/// Keys referenced by `{{key}}` placeholders in `text`.
pub fn placeholders(text: &str) -> Result<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    let mut rest = text;
    while let Some((_, key, after)) = next_placeholder(rest)? {
        keys.insert(key.to_string());
        rest = after;
    }
    Ok(keys)
}

fn next_placeholder(text: &str) -> Result<Option<(&str, &str, &str)>> {
    let Some(start) = text.find(OPEN) else {
        return Ok(None);
    };
    let tail = &text[start + OPEN.len()..];
    let end = tail
        .find(CLOSE)
        .ok_or_else(|| HarnessError::config(format!("unclosed placeholder in `{text}`")))?;

    let key = tail[..end].trim();
    if key.is_empty() {
        return Err(HarnessError::config(format!("empty placeholder in `{text}`")));
    }

    Ok(Some((&text[..start], key, &tail[end + CLOSE.len()..])))
}
