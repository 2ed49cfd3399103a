use std::sync::Arc;

use serde_json::Value;

use super::assertion::{Assertion, AssertionResult, FieldCheck, ValidationReport};
use super::json_path;
use super::schema::{SchemaCache, SchemaLoader};
use crate::error::Result;
use crate::http::Response;

const NOT_JSON: &str = "a body that is not JSON";

/// Evaluates assertions against responses.
///
/// Every assertion is evaluated, failures are returned as data. The only
/// error is a schema that cannot be loaded.
#[derive(Clone)]
pub struct ResponseValidator {
    loader: Arc<dyn SchemaLoader>,
    cache: Arc<SchemaCache>,
}

impl ResponseValidator {
    /// Uses the process-wide schema cache.
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self::with_cache(loader, SchemaCache::global())
    }

    pub fn with_cache(loader: Arc<dyn SchemaLoader>, cache: Arc<SchemaCache>) -> Self {
        Self { loader, cache }
    }

    pub fn validate(&self, response: &Response, assertions: &[Assertion]) -> Result<ValidationReport> {
        let body = response.json();
        let mut results = Vec::with_capacity(assertions.len());

        for assertion in assertions {
            let (passed, expected, actual) = match assertion {
                Assertion::Status(code) => (
                    response.status == *code,
                    code.to_string(),
                    response.status.to_string(),
                ),
                Assertion::ContentType(expected) => check_content_type(response, expected),
                Assertion::Schema(name) => self.check_schema(body.as_ref(), name)?,
                Assertion::Field { path, check } => check_field(body.as_ref(), path, check),
                Assertion::LatencyBelow(bound) => (
                    response.duration < *bound,
                    format!("< {} ms", bound.as_millis()),
                    format!("{} ms", response.duration.as_millis()),
                ),
            };

            results.push(AssertionResult {
                description: assertion.to_string(),
                passed,
                soft: assertion.is_soft(),
                expected,
                actual,
            });
        }

        Ok(ValidationReport { results })
    }

    fn check_schema(&self, body: Option<&Value>, name: &str) -> Result<(bool, String, String)> {
        let validator = self.cache.get_or_load(name, self.loader.as_ref())?;
        let expected = format!("a document matching `{name}`");

        let Some(body) = body else {
            return Ok((false, expected, NOT_JSON.into()));
        };

        let errors: Vec<String> = validator
            .iter_errors(body)
            .map(|error| error.to_string())
            .collect();
        if errors.is_empty() {
            Ok((true, expected, "a matching document".into()))
        } else {
            Ok((false, expected, errors.join("; ")))
        }
    }
}

fn check_content_type(response: &Response, expected: &str) -> (bool, String, String) {
    let expected = expected.split(';').next().unwrap_or_default().trim();
    match response.content_type() {
        Some(actual) => (
            actual.eq_ignore_ascii_case(expected),
            expected.to_string(),
            actual.to_string(),
        ),
        None => (false, expected.to_string(), "no content type".into()),
    }
}

fn check_field(body: Option<&Value>, path: &str, check: &FieldCheck) -> (bool, String, String) {
    let expected = match check {
        FieldCheck::Exists => "a value".to_string(),
        FieldCheck::Equals(value) => value.to_string(),
        FieldCheck::SizeEquals(size) => format!("size {size}"),
        FieldCheck::SizeGreaterThan(size) => format!("size > {size}"),
        FieldCheck::NotEmpty => "a non-empty value".to_string(),
    };

    let Some(body) = body else {
        return (false, expected, NOT_JSON.into());
    };
    let Some(value) = json_path::lookup(body, path) else {
        return (false, expected, "no such field".into());
    };

    match check {
        FieldCheck::Exists => (true, expected, value.to_string()),
        FieldCheck::Equals(wanted) => (value == wanted, expected, value.to_string()),
        FieldCheck::SizeEquals(size) => match size_of(value) {
            Some(actual) => (actual == *size, expected, format!("size {actual}")),
            None => (false, expected, format!("unsized value {value}")),
        },
        FieldCheck::SizeGreaterThan(size) => match size_of(value) {
            Some(actual) => (actual > *size, expected, format!("size {actual}")),
            None => (false, expected, format!("unsized value {value}")),
        },
        FieldCheck::NotEmpty => {
            let passed = !value.is_null() && size_of(value).is_none_or(|size| size > 0);
            (passed, expected, value.to_string())
        }
    }
}

fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(text) => Some(text.chars().count()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::HarnessError;
    use crate::testing::assertion::only_soft;
    use crate::testing::schema::StaticSchemaLoader;

    const BOOKING_SCHEMA: &str = r#"{
        "type": "object",
        "required": ["bookingid", "booking"],
        "properties": {
            "bookingid": { "type": "integer" },
            "booking": { "type": "object" }
        }
    }"#;

    fn validator() -> ResponseValidator {
        let loader = StaticSchemaLoader::new().with_schema("booking", BOOKING_SCHEMA);
        ResponseValidator::with_cache(Arc::new(loader), Arc::new(SchemaCache::new()))
    }

    fn booking_response() -> Response {
        Response::new(200)
            .with_json(&json!({ "bookingid": 7, "booking": { "firstname": "Jim" }, "results": [1, 2] }))
            .with_duration(Duration::from_millis(120))
    }

    #[test]
    fn passing_assertions_produce_a_passing_report() {
        let report = validator()
            .validate(
                &booking_response(),
                &[
                    Assertion::status(200),
                    Assertion::json(),
                    Assertion::schema("booking"),
                    Assertion::field("booking.firstname", FieldCheck::Equals(json!("Jim"))),
                    Assertion::field("results", FieldCheck::SizeGreaterThan(0)),
                    Assertion::latency_below(2000),
                ],
            )
            .unwrap();

        assert!(report.passed(), "{:?}", report.failures());
        assert_eq!(report.results.len(), 6);
    }

    #[test]
    fn every_assertion_is_evaluated_after_a_failure() {
        let report = validator()
            .validate(
                &booking_response(),
                &[
                    Assertion::status(201),
                    Assertion::content_type("text/plain"),
                    Assertion::field("token", FieldCheck::Exists),
                    Assertion::status(200),
                ],
            )
            .unwrap();

        assert!(!report.passed());
        assert_eq!(report.results.len(), 4);
        let failures = report.failures();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].expected, "201");
        assert_eq!(failures[0].actual, "200");
        assert!(report.results[3].passed);
    }

    #[test]
    fn schema_mismatch_is_a_failed_assertion() {
        let response = Response::new(200).with_json(&json!({ "bookingid": "seven" }));
        let report = validator()
            .validate(&response, &[Assertion::schema("booking")])
            .unwrap();
        assert!(!report.passed());

        let mut plain = Response::new(200);
        plain.body = "Created".into();
        let report = validator().validate(&plain, &[Assertion::schema("booking")]).unwrap();
        assert_eq!(report.results[0].actual, NOT_JSON);
    }

    #[test]
    fn unknown_schema_is_an_error() {
        let err = validator()
            .validate(&booking_response(), &[Assertion::schema("nope")])
            .unwrap_err();
        assert!(matches!(err, HarnessError::SchemaLoad { .. }));
    }

    #[test]
    fn validate_is_idempotent() {
        let validator = validator();
        let response = booking_response();
        let assertions = [
            Assertion::status(404),
            Assertion::schema("booking"),
            Assertion::field("results", FieldCheck::SizeEquals(3)),
        ];

        let first = validator.validate(&response, &assertions).unwrap();
        let second = validator.validate(&response, &assertions).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn slow_responses_fail_only_soft_checks() {
        let response = booking_response().with_duration(Duration::from_millis(2500));
        let report = validator()
            .validate(&response, &[Assertion::status(200), Assertion::latency_below(2000)])
            .unwrap();

        assert!(!report.passed());
        assert!(only_soft(&report.failures()));
    }

    #[test]
    fn empty_collections_fail_size_checks() {
        let response = Response::new(200).with_json(&json!({ "results": [] }));
        let report = validator()
            .validate(
                &response,
                &[
                    Assertion::field("results", FieldCheck::SizeGreaterThan(0)),
                    Assertion::field("results", FieldCheck::NotEmpty),
                ],
            )
            .unwrap();
        assert_eq!(report.failures().len(), 2);
    }
}
