//! Core primitives for the Ferry agent host: the deferred-resource proxy,
//! the transport envelope that defines what may cross a process boundary,
//! and the factory contract that splits transportable configuration from
//! live resources. Higher layers compose these without pulling in any
//! transport or hosting machinery.

pub mod context;
pub mod deferred;
pub mod error;
pub mod factory;
pub mod transport;

pub use context::InvocationContext;
pub use deferred::Deferred;
pub use error::{ConstructionError, TransportError};
pub use factory::ResourceFactory;
pub use transport::{Envelope, Transportable, ENVELOPE_FORMAT};
