//! Host configuration, read once and passed around explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ferry_toolset::AuthSpec;

/// Environment variable naming the project engines are attributed to.
pub const ENV_PROJECT: &str = "FERRY_PROJECT";
/// Environment variable naming the region the host runs in.
pub const ENV_LOCATION: &str = "FERRY_LOCATION";
/// Environment variable naming the model used when a blueprint omits one.
pub const ENV_MODEL: &str = "FERRY_MODEL";
/// Environment variable naming the context state key that carries caller tokens.
pub const ENV_AUTH_KEY: &str = "FERRY_AUTH_KEY";

fn default_auth_key() -> String {
    "user_access_token".to_string()
}

/// Configuration an engine host runs under.
///
/// The process environment is consulted in exactly one place,
/// [`HostEnv::from_env`], and the result travels as a value from there on.
/// Apps capture the env they were declared under, so a packed app behaves
/// the same on whichever host unpacks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEnv {
    /// Project engines are attributed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Region the host runs in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Model used when a blueprint does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Context state key where caller access tokens arrive.
    #[serde(default = "default_auth_key")]
    pub auth_key: String,
}

impl Default for HostEnv {
    fn default() -> Self {
        Self {
            project: None,
            location: None,
            default_model: None,
            auth_key: default_auth_key(),
        }
    }
}

impl HostEnv {
    /// Snapshot the process environment. Call this once at startup.
    pub fn from_env() -> Self {
        Self {
            project: read_env(ENV_PROJECT),
            location: read_env(ENV_LOCATION),
            default_model: read_env(ENV_MODEL),
            auth_key: read_env(ENV_AUTH_KEY).unwrap_or_else(default_auth_key),
        }
    }

    /// Build from already-parsed variables, e.g. a deploy manifest's env map.
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            project: get(ENV_PROJECT),
            location: get(ENV_LOCATION),
            default_model: get(ENV_MODEL),
            auth_key: get(ENV_AUTH_KEY).unwrap_or_else(default_auth_key),
        }
    }

    /// Set the project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the region.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the fallback model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the state key callers put access tokens under.
    pub fn with_auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = key.into();
        self
    }

    /// An auth spec reading tokens from this host's configured state key,
    /// with the project attached when one is set.
    pub fn auth(&self) -> AuthSpec {
        let auth = AuthSpec::new(&self.auth_key);
        match &self.project {
            Some(project) => auth.with_project(project),
            None => auth,
        }
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
