//! The factory contract: transportable recipes that build live resources.

use crate::transport::Transportable;
use async_trait::async_trait;
use serde_json::Value;

/// A recipe for constructing a resource on the host where it will run.
///
/// Factories are plain data. Everything a resource needs that can be
/// written down (endpoints, commands, headers, model names) lives in the
/// factory's fields; everything live (clients, processes, sockets) comes
/// into existence inside [`build`](ResourceFactory::build) and never
/// leaves the process that built it. The [`Transportable`] bound makes
/// that split a compile-time rule rather than a deploy-time surprise.
#[async_trait]
pub trait ResourceFactory: Transportable + 'static {
    /// The resource this factory constructs.
    type Resource: Send + Sync + 'static;

    /// Tag used in envelopes and error messages.
    fn kind(&self) -> &'static str;

    /// Construct a fresh resource.
    ///
    /// Called once per successful initialization of a proxy; called again
    /// only after a previous attempt failed.
    async fn build(&self) -> anyhow::Result<Self::Resource>;

    /// Transportable form of a built resource, if it has one.
    ///
    /// Defaults to `None`: a built resource is live and stays behind, and
    /// packing a proxy that holds one fails. Factories whose resources are
    /// plain data may override this together with
    /// [`restore`](ResourceFactory::restore).
    fn snapshot(&self, _resource: &Self::Resource) -> Option<Value> {
        None
    }

    /// Rebuild a resource from a snapshot produced by
    /// [`snapshot`](ResourceFactory::snapshot).
    fn restore(&self, _snapshot: Value) -> anyhow::Result<Self::Resource> {
        anyhow::bail!(
            "Resource kind '{}' does not support snapshot restore",
            self.kind()
        )
    }
}
