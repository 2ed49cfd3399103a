use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

use super::request::Request;
use super::response::Response;
use crate::error::{HarnessError, Result};

/// The only network capability the harness depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HarnessError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        let method: reqwest::Method = request.method.into();
        let mut req_builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        req_builder = apply_headers(req_builder, &request.headers)?;

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.to_text());
        }

        let started = Instant::now();
        let response = req_builder.send().await.map_err(|e| map_error(e, request))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await.map_err(|e| map_error(e, request))?;
        let duration = started.elapsed();

        Ok(Response {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            duration,
        })
    }
}

fn map_error(err: reqwest::Error, request: &Request) -> HarnessError {
    if err.is_timeout() {
        HarnessError::Timeout {
            after: request.timeout,
        }
    } else {
        HarnessError::Network(format!("Request failed: {err}"))
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut collected = BTreeMap::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

fn apply_headers(
    mut req_builder: reqwest::RequestBuilder,
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::RequestBuilder> {
    for (key, value) in headers {
        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| HarnessError::config(format!("Invalid header key `{key}`: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| HarnessError::config(format!("Invalid header value `{value}`: {e}")))?;
        req_builder = req_builder.header(header_name, header_value);
    }

    Ok(req_builder)
}
