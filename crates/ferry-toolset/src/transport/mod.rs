//! Transports that carry tool-protocol requests to a server.
//!
//! A transport owns the live side of a connection (an HTTP client, a child
//! process). Connection *specs* stay in [`crate::spec`]; only specs cross
//! process boundaries, transports never do.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

use crate::error::ToolsetError;
use crate::protocol::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use std::collections::HashMap;

/// One request/response round trip to a tool server.
///
/// `headers` carries per-call values such as authorization, derived fresh
/// from the invocation context each time. Transports without a header
/// channel ignore them.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Send a request and wait for the matching response.
    async fn exchange(
        &self,
        request: RpcRequest,
        headers: &HashMap<String, String>,
    ) -> Result<RpcResponse, ToolsetError>;
}
