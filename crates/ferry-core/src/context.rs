//! Per-invocation context, passed explicitly through every call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// State travelling with a single invocation.
///
/// The hosting platform (or a test) injects whatever the call needs here;
/// nothing downstream reads process environment or global state. Access
/// tokens arrive as state values under a key the host configures, so the
/// same engine serves callers with different credentials without ever
/// owning any itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Session this invocation belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// End user on whose behalf the invocation runs, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Platform-injected values keyed by name.
    #[serde(default)]
    pub state: BTreeMap<String, Value>,
}

impl InvocationContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session ID.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach a user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Insert a state value.
    pub fn with_state_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    /// Bearer token stored under `key`, if the platform injected one.
    ///
    /// A missing or non-string value is not an error; callers fall back
    /// to unauthenticated requests.
    pub fn bearer_token(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(Value::as_str)
    }
}
