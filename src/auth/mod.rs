//! # Authentication
//!
//! Authentication modes a request template can use. Each mode turns into
//! plain headers when the request is built, so the resulting request value
//! carries everything the transport needs.

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{HarnessError, Result};
use crate::state::{self, SharedState};

const AUTHORIZATION: &str = "authorization";
const COOKIE: &str = "cookie";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    None,
    /// Preemptive HTTP Basic with static credentials.
    Basic { username: String, password: String },
    /// The token may contain `{{key}}` placeholders.
    Bearer { token: String },
    /// Sends `Cookie: <name>=<value>` with the value read from shared state.
    Cookie { name: String, state_key: String },
}

impl AuthMode {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthMode::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn cookie(name: impl Into<String>, state_key: impl Into<String>) -> Self {
        AuthMode::Cookie {
            name: name.into(),
            state_key: state_key.into(),
        }
    }

    /// Shared-state keys this mode reads when applied.
    pub fn state_keys(&self) -> Result<BTreeSet<String>> {
        match self {
            AuthMode::None | AuthMode::Basic { .. } => Ok(BTreeSet::new()),
            AuthMode::Bearer { token } => state::placeholders(token),
            AuthMode::Cookie { state_key, .. } => Ok(BTreeSet::from([state_key.clone()])),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AuthMode::None => {}
            AuthMode::Basic { username, .. } => {
                if username.trim().is_empty() {
                    return Err(HarnessError::config("Basic auth username cannot be empty"));
                }
            }
            AuthMode::Bearer { token } => {
                if token.trim().is_empty() {
                    return Err(HarnessError::config("Bearer token cannot be empty"));
                }
                state::placeholders(token)?;
            }
            AuthMode::Cookie { name, state_key } => {
                if name.trim().is_empty() || state_key.trim().is_empty() {
                    return Err(HarnessError::config(
                        "Cookie auth needs a cookie name and a state key",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn apply(&self, headers: &mut BTreeMap<String, String>, state: &SharedState) -> Result<()> {
        match self {
            AuthMode::None => {}
            AuthMode::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username.trim(), password.trim()));
                headers.insert(AUTHORIZATION.to_string(), format!("Basic {encoded}"));
            }
            AuthMode::Bearer { token } => {
                let token = state.interpolate(token.trim())?;
                headers.insert(AUTHORIZATION.to_string(), format!("Bearer {token}"));
            }
            AuthMode::Cookie { name, state_key } => {
                let pair = format!("{}={}", name.trim(), state.require(state_key)?);
                let cookie = match headers.get(COOKIE) {
                    Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
                    _ => pair,
                };
                headers.insert(COOKIE.to_string(), cookie);
            }
        }
        Ok(())
    }
}
