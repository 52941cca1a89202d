//! The live toolset: a connected tool server plus its naming and auth
//! rules. Built by [`crate::spec::ToolsetSpec`]; never transported.

use crate::error::ToolsetError;
use crate::protocol::{
    RemoteTool, RequestId, RpcRequest, ToolCallParams, ToolCallResult, ToolsListResult,
};
use crate::spec::AuthSpec;
use crate::transport::ToolTransport;
use ferry_core::InvocationContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A connected tool server.
///
/// Tool names are exposed with the configured prefix (`"bq"` turns
/// `execute_sql` into `bq_execute_sql`) so several toolsets can share one
/// engine without collisions. Credentials are derived per call from the
/// invocation context, never stored here.
pub struct Toolset {
    name_prefix: String,
    auth: Option<AuthSpec>,
    transport: Box<dyn ToolTransport>,
    next_id: AtomicU64,
}

impl Toolset {
    /// A toolset over an already-open transport.
    ///
    /// [`crate::spec::ToolsetSpec`] is the usual way to get one; this
    /// constructor exists for custom transports and tests.
    pub fn new(
        name_prefix: String,
        auth: Option<AuthSpec>,
        transport: Box<dyn ToolTransport>,
    ) -> Self {
        Self {
            name_prefix,
            auth,
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Prefix stamped onto every tool name this toolset exposes.
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Whether a prefixed tool name belongs to this toolset.
    pub fn owns(&self, tool_name: &str) -> bool {
        self.bare_name(tool_name).is_some()
    }

    fn prefixed(&self, bare: &str) -> String {
        format!("{}_{}", self.name_prefix, bare)
    }

    /// The server-side name behind a prefixed one, if the prefix is ours.
    pub fn bare_name<'a>(&self, prefixed: &'a str) -> Option<&'a str> {
        prefixed
            .strip_prefix(self.name_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn call_headers(&self, ctx: &InvocationContext) -> HashMap<String, String> {
        match &self.auth {
            Some(auth) => auth.headers(ctx),
            None => HashMap::new(),
        }
    }

    /// List the server's tools under this toolset's prefix.
    pub async fn list_tools(
        &self,
        ctx: &InvocationContext,
    ) -> Result<Vec<RemoteTool>, ToolsetError> {
        let headers = self.call_headers(ctx);
        let request = RpcRequest::new(self.next_id(), "tools/list");
        let response = self.transport.exchange(request, &headers).await?;
        let listing: ToolsListResult = serde_json::from_value(response.into_result()?)?;

        debug!(
            prefix = %self.name_prefix,
            count = listing.tools.len(),
            "listed remote tools"
        );
        Ok(listing
            .tools
            .into_iter()
            .map(|tool| RemoteTool {
                name: self.prefixed(&tool.name),
                ..tool
            })
            .collect())
    }

    /// Call a tool by its prefixed name and render the reply as text.
    ///
    /// The prefix is stripped before the call; the server only ever sees
    /// its own bare names. A failure the *tool* reports comes back as an
    /// `"Error: ..."` text reply (the caller is usually a model, and text
    /// is what it can act on); failures of the channel itself are real
    /// errors.
    pub async fn call_tool(
        &self,
        ctx: &InvocationContext,
        tool_name: &str,
        arguments: Value,
    ) -> Result<String, ToolsetError> {
        let bare = self
            .bare_name(tool_name)
            .ok_or_else(|| ToolsetError::ToolNotFound(tool_name.to_string()))?;

        debug!(prefix = %self.name_prefix, tool = %bare, "calling remote tool");
        let headers = self.call_headers(ctx);
        let request = RpcRequest::new(self.next_id(), "tools/call").with_params(ToolCallParams {
            name: bare.to_string(),
            arguments,
        })?;
        let response = self.transport.exchange(request, &headers).await?;
        let result: ToolCallResult = serde_json::from_value(response.into_result()?)?;

        let text = result.render_text();
        if result.is_error {
            Ok(format!("Error: {}", text))
        } else {
            Ok(text)
        }
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("name_prefix", &self.name_prefix)
            .field("auth", &self.auth)
            .finish()
    }
}
