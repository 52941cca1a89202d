//! # Ferry
//!
//! Deferred-resource proxies, transportable toolsets, and agent app
//! hosting. Declare what a resource *is* as plain data, construct it
//! lazily on first use, and ship the declaration (never the live thing)
//! between processes.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! ferry-sdk = "0.1"  # Includes toolsets and hosting by default
//! ```
//!
//! ```rust,no_run
//! use ferry_sdk::{
//!     AgentApp, AppBlueprint, AppRequest, BundleBuilder, EngineHost, HostEnv,
//!     HttpConnectionSpec, InvocationContext, ToolsetSpec,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let env = HostEnv::from_env();
//!
//!     // Declare the app. Nothing connects here.
//!     let blueprint = AppBlueprint::new("billing-helper", "Answer billing questions.")
//!         .with_toolset(
//!             ToolsetSpec::new("billing", HttpConnectionSpec::new("http://localhost:9200/rpc"))
//!                 .with_auth(env.auth()),
//!         );
//!     let app = AgentApp::new(blueprint, env.clone());
//!
//!     // Deployment is serialization: pack the unstarted app...
//!     let bundle = BundleBuilder::new("billing-demo").pack(&app)?;
//!
//!     // ...and a host rebuilds it, cold-starting on the first query.
//!     let host = EngineHost::new(env);
//!     let id = host.deploy(&bundle).await?;
//!     let reply = host
//!         .query(
//!             id,
//!             &InvocationContext::new().with_session("s-1"),
//!             AppRequest::ListTools,
//!         )
//!         .await?;
//!     println!("{reply:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `host` (default): deploy bundles and the in-process engine host
//! - `toolset`: tool-server connections without the hosting layer
//!
//! ## Installation Options
//!
//! ```toml
//! # Default installation with hosting
//! ferry-sdk = "0.1"
//!
//! # Core only (deferred proxies and envelopes, minimal installation)
//! ferry-sdk = { version = "0.1", default-features = false }
//!
//! # Toolsets without the host
//! ferry-sdk = { version = "0.1", default-features = false, features = ["toolset"] }
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core functionality (always available)
pub use ferry_core::{context, deferred, error, factory, transport};
pub use ferry_core::{
    ConstructionError, Deferred, Envelope, InvocationContext, ResourceFactory, TransportError,
    Transportable, ENVELOPE_FORMAT,
};

// Re-export toolset functionality (when the toolset feature is enabled)
#[cfg(feature = "toolset")]
#[cfg_attr(docsrs, doc(cfg(feature = "toolset")))]
pub use ferry_toolset::{
    protocol, AuthSpec, ConnectionSpec, HttpConnectionSpec, StdioConnectionSpec, ToolTransport,
    Toolset, ToolsetError, ToolsetSpec,
};

// Re-export hosting functionality (when the host feature is enabled)
#[cfg(feature = "host")]
#[cfg_attr(docsrs, doc(cfg(feature = "host")))]
pub use ferry_host::{
    AgentApp, AppBlueprint, AppDescriptor, AppRequest, AppResponse, BundleBuilder, ColdStartFactory,
    DeployBundle, DeployManifest, Engine, EngineFactory, EngineHost, EngineSummary, EventRole,
    HostEnv, HostError, InMemorySessionStore, SessionEvent, SessionId, SessionRecord, SessionStore,
};

/// Prelude module for common imports
///
/// ```rust
/// use ferry_sdk::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use ferry_core::{Deferred, Envelope, InvocationContext, ResourceFactory};

    // Toolset essentials (when available)
    #[cfg(feature = "toolset")]
    pub use ferry_toolset::{AuthSpec, ConnectionSpec, HttpConnectionSpec, StdioConnectionSpec, ToolsetSpec};

    // Hosting essentials (when available)
    #[cfg(feature = "host")]
    pub use ferry_host::{
        AgentApp, AppBlueprint, AppRequest, AppResponse, BundleBuilder, DeployBundle, EngineHost,
        HostEnv,
    };
}
