//! JSON-RPC toolset client for the Ferry agent host.
//!
//! A toolset is the canonical deferred resource: its *spec* (connection
//! parameters, name prefix, auth rule) is plain transportable data, while
//! the connected client it builds holds live handles and never crosses a
//! process boundary. [`ToolsetSpec`] implements
//! [`ferry_core::ResourceFactory`], so engines wrap it in a
//! `Deferred<ToolsetSpec>` or build it directly at cold start.
//!
//! Two transports are provided, both feature-gated: `http` (JSON-RPC over
//! POST, via reqwest) and `stdio` (a spawned subprocess speaking
//! newline-delimited JSON). Both are on by default.

pub mod error;
pub mod protocol;
pub mod spec;
pub mod toolset;
pub mod transport;

pub use error::ToolsetError;
pub use protocol::{
    RemoteTool, RequestId, RpcError, RpcRequest, RpcResponse, ToolCallResult, ToolContent,
};
pub use spec::{AuthSpec, ConnectionSpec, HttpConnectionSpec, StdioConnectionSpec, ToolsetSpec};
pub use toolset::Toolset;
pub use transport::ToolTransport;

#[cfg(feature = "http")]
pub use transport::http::HttpToolTransport;

#[cfg(feature = "stdio")]
pub use transport::stdio::StdioToolTransport;
