//! Wire types for the JSON-RPC 2.0 tool protocol.
//!
//! The surface is deliberately small: `tools/list` to discover what a
//! server offers and `tools/call` to invoke one tool. Everything here is
//! plain serde data; no live state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version string stamped on every request and echoed by servers.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier; servers echo it back verbatim.
///
/// We always send numbers, but servers are free to answer with strings,
/// so both spellings deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// An id the server chose to spell as a string
    String(String),
    /// A counter-style numeric id
    Number(u64),
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// An outbound JSON-RPC call.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Echoed back by the server so replies can be matched up
    pub id: RequestId,
    /// What to invoke, e.g. `tools/list`
    pub method: String,
    /// Method arguments, omitted from the wire when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// A call with no parameters.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Attach parameters, failing if they do not serialize.
    pub fn with_params<P: Serialize>(mut self, params: P) -> Result<Self, serde_json::Error> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }
}

/// An inbound JSON-RPC reply: a result or an error, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Version the server claims to speak
    pub jsonrpc: String,
    /// Id of the request this answers
    pub id: RequestId,
    /// Payload on success
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object on failure
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Whether the server answered with an error object.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Split the reply: the payload on success, the server's error otherwise.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// The error object a server puts in a failed reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric code; negative codes are reserved by the protocol
    pub code: i64,
    /// What went wrong, in the server's words
    pub message: String,
    /// Whatever extra detail the server chose to attach
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, ": {}", data)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

/// A tool exposed by a remote server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    /// Tool name
    pub name: String,
    /// What the tool does, for the model's benefit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the tool's arguments
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Payload of a successful `tools/list` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    /// Tools the server offers
    pub tools: Vec<RemoteTool>,
    /// Pagination cursor; the servers we talk to never set it
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// Arguments of a `tools/call` request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams {
    /// Bare tool name as the server knows it
    pub name: String,
    /// Arguments to pass through to the tool
    pub arguments: Value,
}

/// One content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },

    /// An inline image
    Image {
        /// Base64-encoded bytes
        data: String,
        /// What kind of image
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// A server-side resource, possibly with inline text
    Resource {
        /// Where the resource lives
        uri: String,
        /// Inline text, when the server included it
        #[serde(default)]
        text: Option<String>,
        /// Resource media type
        #[serde(rename = "mimeType", default)]
        mime_type: Option<String>,
    },
}

/// Payload of a successful `tools/call` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallResult {
    /// Content blocks returned by the tool
    pub content: Vec<ToolContent>,
    /// Whether this result represents a tool-reported failure
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Flatten the content blocks into a single text reply.
    ///
    /// Images cannot travel as text, so they collapse to a placeholder
    /// naming the media type. Resources contribute their inline text when
    /// they carry any.
    pub fn render_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.content.len());
        for block in &self.content {
            match block {
                ToolContent::Text { text } => parts.push(text.clone()),
                ToolContent::Resource { text: Some(text), .. } => parts.push(text.clone()),
                ToolContent::Resource { text: None, .. } => {}
                ToolContent::Image { mime_type, data } => {
                    parts.push(format!("[image {}, {} base64 chars]", mime_type, data.len()));
                }
            }
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape_is_exact() {
        let req = RpcRequest::new(1u64, "tools/list");
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#
        );
    }

    #[test]
    fn params_are_nested_under_the_key() {
        let req = RpcRequest::new(7u64, "tools/call")
            .with_params(ToolCallParams {
                name: "execute_sql".to_string(),
                arguments: json!({"query": "SELECT 1"}),
            })
            .unwrap();
        let wire: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["params"]["name"], "execute_sql");
        assert_eq!(wire["params"]["arguments"]["query"], "SELECT 1");
    }

    #[test]
    fn responses_split_into_result_or_error() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":42,"result":{"tools":[]}}"#).unwrap();
        assert_eq!(ok.id, RequestId::Number(42));
        assert!(!ok.is_error());
        assert_eq!(ok.into_result().unwrap(), json!({"tools": []}));

        let bad: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"req-3","error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        assert_eq!(bad.id, RequestId::String("req-3".to_string()));
        let err = bad.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Method not found (code -32601)");
    }

    #[test]
    fn tool_listing_reads_camel_case_fields() {
        let listing: ToolsListResult = serde_json::from_value(json!({
            "tools": [{
                "name": "get_table_info",
                "description": "Describe a table",
                "inputSchema": {"type": "object"}
            }]
        }))
        .unwrap();
        assert_eq!(listing.tools[0].name, "get_table_info");
        assert_eq!(listing.tools[0].input_schema["type"], "object");
        assert!(listing.next_cursor.is_none());
    }

    #[test]
    fn rendering_joins_text_blocks() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "row one"},
                {"type": "resource", "uri": "file:///tmp/out.csv", "text": "row two"},
                {"type": "resource", "uri": "file:///tmp/raw.bin"}
            ],
            "isError": false
        }))
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.render_text(), "row one\nrow two");
    }

    #[test]
    fn rendering_replaces_images_with_a_placeholder() {
        let result = ToolCallResult {
            content: vec![ToolContent::Image {
                data: "QUJD".to_string(),
                mime_type: "image/png".to_string(),
            }],
            is_error: false,
        };
        assert_eq!(result.render_text(), "[image image/png, 4 base64 chars]");
    }
}
