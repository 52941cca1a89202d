//! Agent app packaging and hosting.
//!
//! An [`AppBlueprint`] says what an app is; an [`AgentApp`] wraps it in a
//! deferred engine that comes up on first use; a [`DeployBundle`] reduces
//! the unstarted app to bytes; an [`EngineHost`] takes those bytes and
//! serves queries, cold-starting each engine when it is first needed.
//!
//! The through-line is that nothing live ever travels. Deploying, hosting
//! and cold-starting are all the same move: serialize the recipe, rebuild
//! on the other side.

pub mod app;
pub mod blueprint;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod host;
pub mod session;

pub use app::{AgentApp, AppDescriptor, AppRequest, AppResponse, EngineFactory};
pub use blueprint::AppBlueprint;
pub use bundle::{
    detect_extra_files, is_reserved_env_key, parse_env_file, BundleBuilder, DeployBundle,
    DeployManifest, BUNDLE_KIND, RESERVED_ENV_KEYS, RESERVED_ENV_PREFIXES,
};
pub use config::HostEnv;
pub use engine::Engine;
pub use host::{ColdStartFactory, EngineHost, EngineSummary, HostError};
pub use session::{
    EventRole, InMemorySessionStore, SessionEvent, SessionId, SessionRecord, SessionStore,
};
