//! # Testing & Assertions
//!
//! Declarative response assertions and the validator that evaluates them:
//! status code, content type, JSON schema match, field predicates over a
//! JSON path, and a latency bound.

pub mod assertion;
pub mod json_path;
pub mod schema;
pub mod validator;

pub use assertion::{Assertion, AssertionResult, FieldCheck, ValidationReport, only_soft};
pub use schema::{DirSchemaLoader, SchemaCache, SchemaLoader, StaticSchemaLoader};
pub use validator::ResponseValidator;
