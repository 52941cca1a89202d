//! Error types for toolset operations.

use crate::protocol::RpcError;
use thiserror::Error;

/// Everything that can go wrong while talking to a tool server.
///
/// The split that matters downstream: [`ToolsetError::Server`] is the
/// server answering "no" in-protocol, everything else is the channel or
/// the caller at fault.
#[derive(Debug, Error)]
pub enum ToolsetError {
    /// The server replied with an in-protocol error object
    #[error("Tool server error: {0}")]
    Server(#[from] RpcError),

    /// The channel itself failed (connect, HTTP status, broken pipe)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A message did not encode or parse as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes were JSON but not a message we recognize
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server went silent past the configured deadline
    #[error("No response after {0:?}")]
    Timeout(std::time::Duration),

    /// The name carries a prefix no toolset claims
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// The subprocess never came up
    #[error("Failed to spawn tool server: {0}")]
    ProcessSpawn(String),

    /// The subprocess died while we still needed it
    #[error("Tool server process exited unexpectedly")]
    ProcessExited,

    /// I/O outside the happy paths above
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolsetError {
    /// A [`ToolsetError::Transport`] from any printable cause.
    pub fn transport(msg: impl Into<String>) -> Self {
        ToolsetError::Transport(msg.into())
    }

    /// A [`ToolsetError::Protocol`] from any printable cause.
    pub fn protocol(msg: impl Into<String>) -> Self {
        ToolsetError::Protocol(msg.into())
    }

    /// Did the server go silent past its deadline?
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolsetError::Timeout(_))
    }

    /// Did the server itself report this, in-protocol?
    pub fn is_server_error(&self) -> bool {
        matches!(self, ToolsetError::Server(_))
    }

    /// Is the server process gone?
    pub fn is_process_exited(&self) -> bool {
        matches!(self, ToolsetError::ProcessExited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn server_errors_keep_the_server_wording() {
        let err = ToolsetError::from(RpcError {
            code: -32000,
            message: "Quota exceeded".to_string(),
            data: None,
        });
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "Tool server error: Quota exceeded (code -32000)");
    }

    #[test]
    fn constructors_pick_the_right_variant() {
        assert!(matches!(
            ToolsetError::transport("connection refused"),
            ToolsetError::Transport(_)
        ));
        assert!(matches!(
            ToolsetError::protocol("response is not an object"),
            ToolsetError::Protocol(_)
        ));
    }

    #[test]
    fn predicates_match_their_variants() {
        let timeout = ToolsetError::Timeout(Duration::from_secs(5));
        assert!(timeout.is_timeout());
        assert_eq!(timeout.to_string(), "No response after 5s");

        assert!(ToolsetError::ProcessExited.is_process_exited());
        assert!(!ToolsetError::ProcessExited.is_timeout());
        assert!(!ToolsetError::ProcessExited.is_server_error());
    }
}
