//! # Test Sequencer
//!
//! Runs registered cases one at a time in ascending ordering-key order,
//! threading a run-scoped [`SharedState`] between them. A failing or
//! erroring case never stops the run; the sequencer always returns a full
//! [`RunReport`].
//!
//! Dependencies between cases are checked when cases are registered: a case
//! reading a key that another case writes must have a strictly greater
//! ordering key than the writer. A key nobody writes is not a definition
//! error; the reader errors with `MissingState` when it runs.

pub mod case;
pub mod retry;

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::http::{Request, RequestBuilder, Response, Transport};
use crate::report::{CaseReport, Outcome, RunReport};
use crate::state::SharedState;
use crate::testing::{ResponseValidator, json_path};

pub use case::{StateWrite, TestCase};
pub use retry::RetryPolicy;

const MAX_LOGGED_BODY_CHARS: usize = 8 * 1024;

pub struct Sequencer {
    builder: RequestBuilder,
    validator: ResponseValidator,
    cases: Vec<TestCase>,
    deadline: Option<Duration>,
    retry: Option<RetryPolicy>,
}

struct Attempt {
    outcome: Outcome,
    messages: Vec<String>,
}

impl Attempt {
    fn errored(err: &HarnessError) -> Self {
        Self {
            outcome: Outcome::errored(err),
            messages: vec![err.to_string()],
        }
    }
}

impl Sequencer {
    pub fn new(config: &HarnessConfig, validator: ResponseValidator) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: RequestBuilder::new(config)?,
            validator,
            cases: Vec::new(),
            deadline: config.deadline(),
            retry: config.retry.clone(),
        })
    }

    pub fn with_cases(mut self, cases: impl IntoIterator<Item = TestCase>) -> Result<Self> {
        for case in cases {
            self.register(case)?;
        }
        Ok(self)
    }

    pub fn with_retry(mut self, retry: Option<RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Registered cases in execution order.
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Add a case, rejecting it with a configuration error when it breaks
    /// uniqueness or dependency ordering against the cases already known.
    pub fn register(&mut self, case: TestCase) -> Result<()> {
        case.validate()?;

        if let Some(existing) = self
            .cases
            .iter()
            .find(|existing| existing.id == case.id || existing.order == case.order)
        {
            return Err(HarnessError::config(format!(
                "case `{}` (order {}) clashes with case `{}` (order {})",
                case.id, case.order, existing.id, existing.order
            )));
        }

        let reads = self.reads(&case)?;
        for existing in &self.cases {
            if existing.order > case.order {
                if let Some(key) = existing.produces().find(|key| reads.contains(*key)) {
                    return Err(dependency_error(&case, existing, key));
                }
            } else {
                let existing_reads = self.reads(existing)?;
                if let Some(key) = case.produces().find(|key| existing_reads.contains(*key)) {
                    return Err(dependency_error(existing, &case, key));
                }
            }
        }

        let index = self.cases.partition_point(|existing| existing.order < case.order);
        debug!(case = %case.id, order = case.order, "registered case");
        self.cases.insert(index, case);
        Ok(())
    }

    /// Keys `case` reads, counting the default auth when its template has none.
    fn reads(&self, case: &TestCase) -> Result<BTreeSet<String>> {
        let mut keys = self.builder.state_keys(&case.request)?;
        keys.extend(case.depends_on.iter().cloned());
        Ok(keys)
    }

    pub async fn run(&self, transport: &dyn Transport) -> RunReport {
        let (_cancel_tx, mut cancel_rx) = broadcast::channel(1);
        self.run_until_cancelled(transport, &mut cancel_rx).await
    }

    /// Like [`Sequencer::run`], but stops between cases once `cancel_rx`
    /// receives a signal or the configured deadline has passed. Cases
    /// already recorded stay in the report.
    pub async fn run_until_cancelled(
        &self,
        transport: &dyn Transport,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(Utc::now());
        let mut state = SharedState::new();

        info!(cases = self.cases.len(), "starting run");
        for (index, case) in self.cases.iter().enumerate() {
            if let Some(reason) = self.stop_reason(started, cancel_rx) {
                warn!(reason, remaining = self.cases.len() - index, "stopping run");
                report.cancelled = true;
                report.not_run = self.cases[index..]
                    .iter()
                    .map(|case| case.id.clone())
                    .collect();
                break;
            }

            let case_report = self.run_case(case, &mut state, transport).await;
            report.cases.push(case_report);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        let summary = report.summary();
        info!(
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            duration_ms = report.duration_ms,
            "run finished"
        );
        report
    }

    fn stop_reason(
        &self,
        started: Instant,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Option<&'static str> {
        if self.deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
            return Some("run deadline expired");
        }
        match cancel_rx.try_recv() {
            Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => Some("run cancelled"),
            Err(_) => None,
        }
    }

    async fn run_case(
        &self,
        case: &TestCase,
        state: &mut SharedState,
        transport: &dyn Transport,
    ) -> CaseReport {
        let started = Instant::now();
        let mut attempts = 0;

        let attempt = loop {
            attempts += 1;
            let attempt = self.attempt(case, state, transport).await;
            match &self.retry {
                Some(policy) if policy.should_retry(attempts, &attempt.outcome) => {
                    info!(case = %case.id, attempt = attempts, "retrying case");
                    tokio::time::sleep(policy.delay()).await;
                }
                _ => break attempt,
            }
        };

        match &attempt.outcome {
            Outcome::Passed => info!(case = %case.id, "passed"),
            Outcome::Failed { failures } => {
                warn!(case = %case.id, failures = failures.len(), "failed")
            }
            Outcome::Errored { kind, message } => {
                warn!(case = %case.id, %kind, %message, "errored")
            }
        }

        CaseReport {
            id: case.id.clone(),
            order: case.order,
            outcome: attempt.outcome,
            duration_ms: started.elapsed().as_millis() as u64,
            attempts,
            messages: attempt.messages,
        }
    }

    async fn attempt(
        &self,
        case: &TestCase,
        state: &mut SharedState,
        transport: &dyn Transport,
    ) -> Attempt {
        let request = match self.builder.build(&case.request, state) {
            Ok(request) => request,
            Err(err) => return Attempt::errored(&err),
        };

        debug!(case = %case.id, request = %request, "sending request");
        let response = match tokio::time::timeout(request.timeout, transport.send(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(case = %case.id, request = %request, error = %err, "transport failed");
                return Attempt::errored(&err);
            }
            Err(_) => {
                let err = HarnessError::Timeout {
                    after: request.timeout,
                };
                warn!(case = %case.id, request = %request, error = %err, "transport failed");
                return Attempt::errored(&err);
            }
        };
        debug!(
            case = %case.id,
            status = response.status,
            duration_ms = response.duration.as_millis() as u64,
            size_bytes = response.size_bytes(),
            "received response"
        );

        let validation = match self.validator.validate(&response, &case.assertions) {
            Ok(validation) => validation,
            Err(err) => {
                log_exchange(&case.id, &request, &response);
                return Attempt::errored(&err);
            }
        };
        if !validation.passed() {
            log_exchange(&case.id, &request, &response);
            let failures = validation.failures();
            return Attempt {
                messages: failures.iter().map(|failure| failure.message()).collect(),
                outcome: Outcome::Failed { failures },
            };
        }

        match extract_writes(case, &response) {
            Ok(values) => {
                let messages = values
                    .iter()
                    .map(|(key, _)| format!("stored `{key}`"))
                    .collect();
                for (key, value) in values {
                    state.insert(key, value);
                }
                Attempt {
                    outcome: Outcome::Passed,
                    messages,
                }
            }
            Err(err) => {
                log_exchange(&case.id, &request, &response);
                Attempt::errored(&err)
            }
        }
    }
}

/// All writes of a case succeed together or none is applied.
fn extract_writes(case: &TestCase, response: &Response) -> Result<Vec<(String, String)>> {
    if case.writes.is_empty() {
        return Ok(Vec::new());
    }

    let body = response.json();
    case.writes
        .iter()
        .map(|write| {
            body.as_ref()
                .and_then(|body| json_path::lookup(body, &write.path))
                .filter(|value| !value.is_null())
                .map(|value| (write.key.clone(), json_path::to_text(value)))
                .ok_or_else(|| HarnessError::Extraction {
                    key: write.key.clone(),
                    path: write.path.clone(),
                })
        })
        .collect()
}

fn dependency_error(reader: &TestCase, writer: &TestCase, key: &str) -> HarnessError {
    HarnessError::config(format!(
        "case `{}` (order {}) reads `{key}` written by case `{}` (order {}); writers must run first",
        reader.id, reader.order, writer.id, writer.order
    ))
}

fn log_exchange(case_id: &str, request: &Request, response: &Response) {
    let body = request
        .body
        .as_ref()
        .map(|body| body.to_text())
        .unwrap_or_default();
    warn!(
        case = case_id,
        request = %request,
        request_body = truncate(&body),
        status = response.status,
        response_body = truncate(&response.body),
        "request/response for failed case"
    );
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::auth::AuthMode;
    use crate::error::ErrorKind;
    use crate::http::RequestTemplate;
    use crate::testing::{Assertion, SchemaCache, StaticSchemaLoader};

    /// Answers by `"METHOD /path"`, records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        routes: HashMap<String, Response>,
        delays: HashMap<String, Duration>,
        sent: Mutex<Vec<Request>>,
    }

    impl ScriptedTransport {
        fn route(mut self, key: &str, response: Response) -> Self {
            self.routes.insert(key.to_string(), response);
            self
        }

        fn slow(mut self, key: &str, delay: Duration) -> Self {
            self.delays.insert(key.to_string(), delay);
            self
        }

        fn sent(&self) -> Vec<Request> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &Request) -> Result<Response> {
            self.sent.lock().unwrap().push(request.clone());
            let url = reqwest::Url::parse(&request.url).unwrap();
            let key = format!("{} {}", request.method, url.path());
            if let Some(delay) = self.delays.get(&key) {
                tokio::time::sleep(*delay).await;
            }
            self.routes
                .get(&key)
                .cloned()
                .ok_or_else(|| HarnessError::Network(format!("connection refused for {key}")))
        }
    }

    fn config() -> HarnessConfig {
        HarnessConfig {
            base_url: "http://booker.test".into(),
            timeout_ms: 500,
            ..Default::default()
        }
    }

    fn new_sequencer() -> Sequencer {
        let loader = StaticSchemaLoader::new().with_schema("token", r#"{ "required": ["token"] }"#);
        let validator = ResponseValidator::with_cache(Arc::new(loader), Arc::new(SchemaCache::new()));
        Sequencer::new(&config(), validator).unwrap()
    }

    fn auth_case(order: u32) -> TestCase {
        TestCase::new("create_auth_token", order, RequestTemplate::post("/auth"))
            .expect(Assertion::status(200))
            .writes("token", "token")
    }

    fn delete_case(order: u32) -> TestCase {
        TestCase::new(
            "delete_booking",
            order,
            RequestTemplate::delete("/booking/1").auth(AuthMode::cookie("token", "token")),
        )
        .expect(Assertion::status(201))
    }

    #[test]
    fn rejects_readers_ordered_before_writers() {
        let mut sequencer = new_sequencer();
        sequencer.register(delete_case(2)).unwrap();
        let err = sequencer.register(auth_case(9)).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));

        let mut sequencer = new_sequencer();
        sequencer.register(auth_case(5)).unwrap();
        assert!(sequencer.register(delete_case(5).depends_on("x")).is_err());
        let err = sequencer.register(delete_case(4)).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn default_auth_placeholders_are_dependencies() {
        let config = HarnessConfig {
            bearer_token: Some("{{token}}".into()),
            ..config()
        };
        let validator = ResponseValidator::with_cache(
            Arc::new(StaticSchemaLoader::new()),
            Arc::new(SchemaCache::new()),
        );
        let mut sequencer = Sequencer::new(&config, validator).unwrap();
        sequencer
            .register(TestCase::new("list_booking_ids", 1, RequestTemplate::get("/booking")))
            .unwrap();
        let login = TestCase::new(
            "create_auth_token",
            2,
            RequestTemplate::post("/auth").auth(AuthMode::None),
        )
        .writes("token", "token");
        let err = sequencer.register(login).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn rejects_duplicate_ids_and_orders() {
        let mut sequencer = new_sequencer();
        sequencer.register(auth_case(1)).unwrap();
        assert!(sequencer.register(auth_case(2)).is_err());
        assert!(
            sequencer
                .register(TestCase::new("ping", 1, RequestTemplate::get("/ping")))
                .is_err()
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        let mut sequencer = new_sequencer();
        let err = sequencer
            .register(TestCase::new("bad", 1, RequestTemplate::get("/booking/{{id")))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn orders_cases_by_key() {
        let sequencer = new_sequencer()
            .with_cases([
                delete_case(9),
                TestCase::new("ping", 10, RequestTemplate::get("/ping")),
                auth_case(2),
            ])
            .unwrap();
        let orders: Vec<u32> = sequencer.cases().iter().map(|case| case.order).collect();
        assert_eq!(orders, vec![2, 9, 10]);
    }

    #[tokio::test]
    async fn threads_state_between_cases() {
        let transport = ScriptedTransport::default()
            .route("POST /auth", Response::new(200).with_json(&json!({ "token": "abc123" })))
            .route("DELETE /booking/1", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([auth_case(2), delete_case(9)])
            .unwrap();

        let report = sequencer.run(&transport).await;

        assert!(report.success(), "{}", report.render_text());
        let sent = transport.sent();
        assert_eq!(sent[1].header("cookie"), Some("token=abc123"));
    }

    #[tokio::test]
    async fn missing_writer_errors_the_reader_without_sending() {
        let transport = ScriptedTransport::default().route("DELETE /booking/1", Response::new(201));
        let sequencer = new_sequencer().with_cases([delete_case(9)]).unwrap();

        let report = sequencer.run(&transport).await;

        let case = report.case("delete_booking").unwrap();
        assert_eq!(case.outcome.error_kind(), Some(ErrorKind::MissingState));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_run() {
        let transport = ScriptedTransport::default()
            .route("POST /auth", Response::new(403))
            .route("GET /ping", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([
                auth_case(1),
                delete_case(2),
                TestCase::new("health_check", 3, RequestTemplate::get("/ping"))
                    .expect(Assertion::status(201)),
            ])
            .unwrap();

        let report = sequencer.run(&transport).await;

        assert!(matches!(
            report.case("create_auth_token").unwrap().outcome,
            Outcome::Failed { .. }
        ));
        assert_eq!(
            report.case("delete_booking").unwrap().outcome.error_kind(),
            Some(ErrorKind::MissingState)
        );
        assert!(report.case("health_check").unwrap().outcome.is_passed());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_transport_times_out_and_run_continues() {
        let transport = ScriptedTransport::default()
            .route("GET /booking", Response::new(200))
            .slow("GET /booking", Duration::from_secs(30))
            .route("GET /ping", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([
                TestCase::new("list_booking_ids", 1, RequestTemplate::get("/booking"))
                    .expect(Assertion::status(200)),
                TestCase::new("health_check", 2, RequestTemplate::get("/ping"))
                    .expect(Assertion::status(201)),
            ])
            .unwrap();

        let report = sequencer.run(&transport).await;

        assert_eq!(
            report.case("list_booking_ids").unwrap().outcome.error_kind(),
            Some(ErrorKind::Timeout)
        );
        assert!(report.case("health_check").unwrap().outcome.is_passed());
    }

    #[tokio::test]
    async fn missing_extraction_path_errors_the_writer() {
        let transport = ScriptedTransport::default()
            .route("POST /auth", Response::new(200).with_json(&json!({ "reason": "Bad credentials" })));
        let sequencer = new_sequencer().with_cases([auth_case(1)]).unwrap();

        let report = sequencer.run(&transport).await;

        assert_eq!(
            report.case("create_auth_token").unwrap().outcome.error_kind(),
            Some(ErrorKind::Extraction)
        );
    }

    #[tokio::test]
    async fn schema_load_errors_are_contained_to_the_case() {
        let transport = ScriptedTransport::default()
            .route("GET /ping", Response::new(201))
            .route("GET /booking", Response::new(200).with_json(&json!([])));
        let sequencer = new_sequencer()
            .with_cases([
                TestCase::new("list_booking_ids", 1, RequestTemplate::get("/booking"))
                    .expect(Assertion::schema("missing_schema")),
                TestCase::new("health_check", 2, RequestTemplate::get("/ping"))
                    .expect(Assertion::status(201)),
            ])
            .unwrap();

        let report = sequencer.run(&transport).await;

        assert_eq!(
            report.case("list_booking_ids").unwrap().outcome.error_kind(),
            Some(ErrorKind::SchemaLoad)
        );
        assert!(report.case("health_check").unwrap().outcome.is_passed());
    }

    #[tokio::test(start_paused = true)]
    async fn soft_failures_are_retried() {
        let slow = Response::new(200).with_duration(Duration::from_millis(3000));
        let transport = ScriptedTransport::default().route("GET /booking", slow);
        let sequencer = new_sequencer()
            .with_cases([TestCase::new("list_booking_ids", 1, RequestTemplate::get("/booking"))
                .expect(Assertion::status(200))
                .expect(Assertion::latency_below(2000))])
            .unwrap()
            .with_retry(Some(RetryPolicy::default()));

        let report = sequencer.run(&transport).await;

        let case = report.case("list_booking_ids").unwrap();
        assert_eq!(case.attempts, 3);
        assert!(matches!(case.outcome, Outcome::Failed { .. }));
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_between_cases() {
        let transport = ScriptedTransport::default().route("GET /ping", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([TestCase::new("health_check", 1, RequestTemplate::get("/ping"))])
            .unwrap();

        let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
        cancel_tx.send(()).unwrap();
        let report = sequencer.run_until_cancelled(&transport, &mut cancel_rx).await;

        assert!(report.cancelled);
        assert!(report.cases.is_empty());
        assert_eq!(report.not_run, vec!["health_check".to_string()]);
    }

    #[tokio::test]
    async fn zero_deadline_runs_nothing() {
        let transport = ScriptedTransport::default().route("GET /ping", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([TestCase::new("health_check", 1, RequestTemplate::get("/ping"))])
            .unwrap()
            .with_deadline(Some(Duration::ZERO));

        let report = sequencer.run(&transport).await;

        assert!(report.cancelled);
        assert!(report.cases.is_empty());
        assert_eq!(report.not_run.len(), 1);
        assert_eq!(report.exit_code(), 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_mid_run_keeps_recorded_outcomes() {
        let transport = ScriptedTransport::default()
            .route("GET /booking", Response::new(200))
            .slow("GET /booking", Duration::from_millis(400))
            .route("GET /ping", Response::new(201));
        let sequencer = new_sequencer()
            .with_cases([
                TestCase::new("list_booking_ids", 1, RequestTemplate::get("/booking"))
                    .expect(Assertion::status(200)),
                TestCase::new("health_check", 2, RequestTemplate::get("/ping"))
                    .expect(Assertion::status(201)),
            ])
            .unwrap()
            .with_deadline(Some(Duration::from_millis(300)));

        let report = sequencer.run(&transport).await;

        assert!(report.cancelled);
        assert_eq!(report.cases.len(), 1);
        assert!(report.case("list_booking_ids").unwrap().outcome.is_passed());
        assert_eq!(report.not_run, vec!["health_check".to_string()]);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(report.exit_code(), 1);
    }
}
