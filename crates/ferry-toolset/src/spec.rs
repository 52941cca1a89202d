//! Transportable connection specs: the factory side of a toolset.
//!
//! A [`ToolsetSpec`] is everything needed to construct a toolset, written
//! down as plain data. Specs travel inside deploy bundles; the live
//! [`Toolset`] they build never does.

use crate::error::ToolsetError;
use crate::toolset::Toolset;
use crate::transport::ToolTransport;
use async_trait::async_trait;
use ferry_core::{InvocationContext, ResourceFactory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_http_timeout() -> u64 {
    30
}

fn default_stdio_timeout() -> u64 {
    600
}

fn default_project_header() -> String {
    "X-User-Project".to_string()
}

/// Connection parameters for an HTTP tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConnectionSpec {
    /// Endpoint URL of the server
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Static headers sent on every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl HttpConnectionSpec {
    /// Connection parameters for the given endpoint, with defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_http_timeout(),
            headers: HashMap::new(),
        }
    }

    /// Add a static header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Connection parameters for a tool server spawned as a subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioConnectionSpec {
    /// Command to run (e.g. "npx", "python")
    pub command: String,

    /// Arguments for the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables for the process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Read timeout in seconds; stdio servers can be slow to warm up
    #[serde(default = "default_stdio_timeout")]
    pub timeout_secs: u64,
}

impl StdioConnectionSpec {
    /// Connection parameters for the given command, with defaults.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: default_stdio_timeout(),
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the process
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the read timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// How to reach a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionSpec {
    /// JSON-RPC over HTTP POST
    Http(HttpConnectionSpec),
    /// JSON-RPC over a subprocess's stdin/stdout
    Stdio(StdioConnectionSpec),
}

impl ConnectionSpec {
    /// Open the live transport this spec describes.
    pub(crate) async fn connect(&self) -> Result<Box<dyn ToolTransport>, ToolsetError> {
        match self {
            ConnectionSpec::Http(spec) => connect_http(spec).await,
            ConnectionSpec::Stdio(spec) => connect_stdio(spec).await,
        }
    }
}

impl From<HttpConnectionSpec> for ConnectionSpec {
    fn from(spec: HttpConnectionSpec) -> Self {
        ConnectionSpec::Http(spec)
    }
}

impl From<StdioConnectionSpec> for ConnectionSpec {
    fn from(spec: StdioConnectionSpec) -> Self {
        ConnectionSpec::Stdio(spec)
    }
}

#[cfg(feature = "http")]
async fn connect_http(spec: &HttpConnectionSpec) -> Result<Box<dyn ToolTransport>, ToolsetError> {
    let transport = crate::transport::http::HttpToolTransport::new(&spec.url)
        .with_headers(spec.headers.clone())
        .with_timeout_secs(spec.timeout_secs)
        .build()?;
    Ok(Box::new(transport))
}

#[cfg(not(feature = "http"))]
async fn connect_http(_spec: &HttpConnectionSpec) -> Result<Box<dyn ToolTransport>, ToolsetError> {
    Err(ToolsetError::transport(
        "http transport support is not compiled in (enable the 'http' feature)",
    ))
}

#[cfg(feature = "stdio")]
async fn connect_stdio(spec: &StdioConnectionSpec) -> Result<Box<dyn ToolTransport>, ToolsetError> {
    let transport = crate::transport::stdio::StdioToolTransport::spawn(
        &spec.command,
        &spec.args,
        &spec.env,
        std::time::Duration::from_secs(spec.timeout_secs),
    )
    .await?;
    Ok(Box::new(transport))
}

#[cfg(not(feature = "stdio"))]
async fn connect_stdio(_spec: &StdioConnectionSpec) -> Result<Box<dyn ToolTransport>, ToolsetError> {
    Err(ToolsetError::transport(
        "stdio transport support is not compiled in (enable the 'stdio' feature)",
    ))
}

/// How per-call credentials are derived from the invocation context.
///
/// The spec records *where* a token lives, never the token itself. Each
/// call looks the token up fresh, so the same toolset serves callers with
/// different credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Context state key holding the caller's bearer token
    pub token_key: String,

    /// Optional project to attribute requests to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Header carrying the project attribution
    #[serde(default = "default_project_header")]
    pub project_header: String,
}

impl AuthSpec {
    /// Derive credentials from the given context state key.
    pub fn new(token_key: impl Into<String>) -> Self {
        Self {
            token_key: token_key.into(),
            project: None,
            project_header: default_project_header(),
        }
    }

    /// Attribute requests to a project
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Use a different attribution header
    pub fn with_project_header(mut self, header: impl Into<String>) -> Self {
        self.project_header = header.into();
        self
    }

    /// Headers for one call.
    ///
    /// No token in the context means no `Authorization` header; the
    /// request goes out unauthenticated rather than failing.
    pub fn headers(&self, ctx: &InvocationContext) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        match ctx.bearer_token(&self.token_key) {
            Some(token) => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            None => {
                tracing::debug!(
                    token_key = %self.token_key,
                    "no bearer token in context; sending unauthenticated request"
                );
            }
        }
        if let Some(project) = &self.project {
            headers.insert(self.project_header.clone(), project.clone());
        }
        headers
    }
}

/// Everything needed to construct a [`Toolset`], as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsetSpec {
    /// Prefix stamped onto every tool name this toolset exposes
    pub name_prefix: String,

    /// How to reach the tool server
    pub connection: ConnectionSpec,

    /// How to derive per-call credentials, if the server wants any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSpec>,
}

impl ToolsetSpec {
    /// A spec with the given prefix and connection.
    pub fn new(name_prefix: impl Into<String>, connection: impl Into<ConnectionSpec>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            connection: connection.into(),
            auth: None,
        }
    }

    /// Attach an auth rule
    pub fn with_auth(mut self, auth: AuthSpec) -> Self {
        self.auth = Some(auth);
        self
    }
}

#[async_trait]
impl ResourceFactory for ToolsetSpec {
    type Resource = Toolset;

    fn kind(&self) -> &'static str {
        "toolset"
    }

    async fn build(&self) -> anyhow::Result<Toolset> {
        tracing::debug!(prefix = %self.name_prefix, "connecting toolset");
        let transport = self.connection.connect().await?;
        Ok(Toolset::new(
            self.name_prefix.clone(),
            self.auth.clone(),
            transport,
        ))
    }
}
