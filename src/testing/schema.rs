//! JSON schema resolution and caching.
//!
//! Schemas are identified by name. A [`SchemaLoader`] turns a name into a
//! schema document, and [`SchemaCache`] keeps the compiled validator for the
//! rest of the process. The schema set is small and fixed, so nothing is
//! ever evicted.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{HarnessError, Result};

pub trait SchemaLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<Value>;
}

/// Reads `<dir>/<name>.json` (or `<dir>/<name>` when the name has an extension).
#[derive(Debug, Clone)]
pub struct DirSchemaLoader {
    dir: PathBuf,
}

impl DirSchemaLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        if Path::new(name).extension().is_some() {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{name}.json"))
        }
    }
}

impl SchemaLoader for DirSchemaLoader {
    fn load(&self, name: &str) -> Result<Value> {
        let file = self.path_for(name);
        let raw = fs::read_to_string(&file).map_err(|e| HarnessError::SchemaLoad {
            name: name.to_string(),
            reason: format!("cannot read `{}`: {e}", file.display()),
        })?;
        parse_schema(name, &raw)
    }
}

/// Schemas compiled into the binary or registered in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaLoader {
    schemas: HashMap<String, String>,
}

impl StaticSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.schemas.insert(name.into(), raw.into());
        self
    }
}

impl SchemaLoader for StaticSchemaLoader {
    fn load(&self, name: &str) -> Result<Value> {
        let raw = self.schemas.get(name).ok_or_else(|| HarnessError::SchemaLoad {
            name: name.to_string(),
            reason: "no schema registered under this name".into(),
        })?;
        parse_schema(name, raw)
    }
}

fn parse_schema(name: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| HarnessError::SchemaLoad {
        name: name.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Compiled validators keyed by schema name.
#[derive(Debug, Default)]
pub struct SchemaCache {
    inner: Mutex<HashMap<String, Arc<Validator>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<SchemaCache> {
        static GLOBAL: OnceLock<Arc<SchemaCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SchemaCache::new())))
    }

    /// Fetch or load-and-compile the validator for `name`.
    pub fn get_or_load(&self, name: &str, loader: &dyn SchemaLoader) -> Result<Arc<Validator>> {
        if let Some(existing) = self.lock().get(name) {
            return Ok(Arc::clone(existing));
        }

        let document = loader.load(name)?;
        let validator = Validator::new(&document).map_err(|err| HarnessError::SchemaLoad {
            name: name.to_string(),
            reason: format!("invalid JSON Schema: {err}"),
        })?;
        tracing::debug!(schema = name, "compiled schema");

        let validator = Arc::new(validator);
        self.lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&validator));
        Ok(validator)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Validator>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
