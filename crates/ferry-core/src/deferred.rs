//! The deferred-resource proxy: owns a factory now, a resource later.

use crate::error::{ConstructionError, TransportError};
use crate::factory::ResourceFactory;
use crate::transport::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

/// Envelope payload for a packed proxy: the factory, plus a resource
/// snapshot when the factory provides one.
#[derive(Debug, Serialize, Deserialize)]
struct DeferredRecord {
    factory: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<Value>,
}

/// A proxy around a resource that is constructed on first access.
///
/// The proxy holds its [`ResourceFactory`] from the start and fills its
/// resource slot exactly once, on the first successful
/// [`acquire`](Deferred::acquire). Because the factory is plain data, the
/// proxy can cross a process boundary through [`pack`](Deferred::pack)
/// while the slot is still empty; the receiving host unpacks it and
/// constructs its own resource on first use. That is the whole trick: ship
/// the recipe, not the dish.
pub struct Deferred<F: ResourceFactory> {
    factory: F,
    cell: OnceCell<F::Resource>,
}

impl<F: ResourceFactory> Deferred<F> {
    /// Wrap a factory without constructing anything.
    pub fn new(factory: F) -> Self {
        Deferred {
            factory,
            cell: OnceCell::new(),
        }
    }

    /// The factory this proxy was constructed with.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether the resource has been constructed.
    pub fn is_built(&self) -> bool {
        self.cell.initialized()
    }

    /// The resource, if it has already been constructed.
    pub fn peek(&self) -> Option<&F::Resource> {
        self.cell.get()
    }

    /// The resource, constructing it on first call.
    ///
    /// Every call returns the same instance once construction has
    /// succeeded. Concurrent callers race for a single construction: one
    /// runs the factory while the rest wait for its result. A failed
    /// construction leaves the slot empty, so the next call simply tries
    /// again.
    pub async fn acquire(&self) -> Result<&F::Resource, ConstructionError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!(kind = self.factory.kind(), "constructing deferred resource");
                self.factory.build().await.map_err(|source| {
                    tracing::warn!(
                        kind = self.factory.kind(),
                        error = %source,
                        "resource construction failed"
                    );
                    ConstructionError::new(self.factory.kind(), source)
                })
            })
            .await
    }

    /// Pack the proxy into an [`Envelope`] for transport.
    ///
    /// While the slot is empty the envelope carries the factory alone.
    /// Once a resource has been built it travels only if the factory can
    /// snapshot it; otherwise this fails with
    /// [`TransportError::NonTransportableResource`] and the proxy is left
    /// exactly as it was.
    pub fn pack(&self) -> Result<Envelope, TransportError> {
        let kind = self.factory.kind();
        let resource = match self.cell.get() {
            None => None,
            Some(resource) => {
                let snapshot = self.factory.snapshot(resource).ok_or_else(|| {
                    TransportError::NonTransportableResource {
                        kind: kind.to_string(),
                    }
                })?;
                Some(snapshot)
            }
        };
        let factory =
            serde_json::to_value(&self.factory).map_err(|source| TransportError::encode(kind, source))?;
        Envelope::encode(kind, &DeferredRecord { factory, resource })
    }

    /// Rebuild a proxy from a packed envelope.
    ///
    /// The envelope's kind tag must match the factory's own kind. A
    /// resource snapshot, when present, is restored through the factory
    /// and installed in the slot; otherwise the proxy comes back empty and
    /// constructs on first acquire.
    pub fn unpack(envelope: &Envelope) -> Result<Self, TransportError> {
        envelope.check_format()?;
        let record: DeferredRecord = serde_json::from_value(envelope.payload.clone())
            .map_err(|source| TransportError::decode(envelope.kind.clone(), source))?;
        let factory: F = serde_json::from_value(record.factory)
            .map_err(|source| TransportError::decode(envelope.kind.clone(), source))?;
        if factory.kind() != envelope.kind {
            return Err(TransportError::KindMismatch {
                expected: factory.kind().to_string(),
                found: envelope.kind.clone(),
            });
        }
        let cell = match record.resource {
            None => OnceCell::new(),
            Some(snapshot) => {
                let resource =
                    factory
                        .restore(snapshot)
                        .map_err(|source| TransportError::Restore {
                            kind: factory.kind().to_string(),
                            source: source.into(),
                        })?;
                tracing::debug!(kind = factory.kind(), "restored resource from snapshot");
                OnceCell::new_with(Some(resource))
            }
        };
        Ok(Deferred { factory, cell })
    }
}

impl<F> std::fmt::Debug for Deferred<F>
where
    F: ResourceFactory + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The resource itself is deliberately not printed; it may hold
        // credentials or live handles.
        f.debug_struct("Deferred")
            .field("factory", &self.factory)
            .field("built", &self.is_built())
            .finish()
    }
}
