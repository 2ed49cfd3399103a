use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use reqwest::Url;

use super::request::{Body, Request};
use super::template::{RequestTemplate, interpolate_json};
use crate::auth::AuthMode;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::state::SharedState;

const ACCEPT: &str = "accept";
const CONTENT_TYPE: &str = "content-type";

/// Turns templates into concrete requests using the configured defaults.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    content_type: String,
    accept: Option<String>,
    auth: AuthMode,
    timeout: Duration,
}

impl RequestBuilder {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| HarnessError::config(format!("Invalid base URL `{}`: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(HarnessError::config(format!(
                "Base URL `{}` cannot take a path",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            content_type: config.content_type.clone(),
            accept: config.accept.clone(),
            auth: config.default_auth(),
            timeout: config.timeout(),
        })
    }

    /// Resolve `template` against `state`. Any referenced key that is not in
    /// `state` fails with [`HarnessError::MissingState`].
    ///
    /// Each path segment is resolved on its own and percent-encoded, so a
    /// stored value containing `/`, `?` or `#` stays inside its segment.
    pub fn build(&self, template: &RequestTemplate, state: &SharedState) -> Result<Request> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                HarnessError::config(format!("Base URL `{}` cannot take a path", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in template.path.trim_start_matches('/').split('/') {
                segments.push(&state.interpolate(segment)?);
            }
        }

        if !template.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &template.query {
                query_pairs.append_pair(key.trim(), &state.interpolate(value)?);
            }
        }

        let mut headers = BTreeMap::new();
        if let Some(accept) = &self.accept {
            headers.insert(ACCEPT.to_string(), accept.clone());
        }
        for (name, value) in &template.headers {
            headers.insert(name.trim().to_ascii_lowercase(), state.interpolate(value)?);
        }

        let body = match &template.body {
            Some(Body::Json(value)) => Some(Body::Json(interpolate_json(value, state)?)),
            Some(Body::Text(text)) => Some(Body::Text(state.interpolate(text)?)),
            None => None,
        };

        if body.is_some() || template.content_type.is_some() {
            let content_type = template
                .content_type
                .clone()
                .unwrap_or_else(|| self.content_type.clone());
            headers.entry(CONTENT_TYPE.to_string()).or_insert(content_type);
        }

        template
            .auth
            .as_ref()
            .unwrap_or(&self.auth)
            .apply(&mut headers, state)?;

        Ok(Request {
            method: template.method,
            url: url.into(),
            headers,
            body,
            timeout: self.timeout,
        })
    }

    /// Every state key [`RequestBuilder::build`] resolves for `template`,
    /// including the default auth's when the template does not override it.
    pub fn state_keys(&self, template: &RequestTemplate) -> Result<BTreeSet<String>> {
        let mut keys = template.state_keys()?;
        if template.auth.is_none() {
            keys.extend(self.auth.state_keys()?);
        }
        Ok(keys)
    }
}
