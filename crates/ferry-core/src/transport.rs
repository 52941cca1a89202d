//! The transport envelope: the canonical form in which factories and
//! resource snapshots cross a process boundary.

use crate::error::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope format version written by this build.
pub const ENVELOPE_FORMAT: u32 = 1;

/// A versioned, tagged JSON payload.
///
/// Everything that crosses a process or host boundary travels as an
/// envelope: the factory of a deferred resource, an optional resource
/// snapshot, a whole deploy bundle. Decoding checks the format version and
/// the kind tag before touching the payload, so a stale or foreign blob
/// fails loudly instead of deserializing into the wrong type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Format version; bumped when the payload layout changes.
    pub format: u32,
    /// Tag naming what the payload holds (e.g. `"toolset"`, `"agent-app"`).
    pub kind: String,
    /// The payload itself.
    pub payload: Value,
}

impl Envelope {
    /// Wrap a payload under a kind tag at the current format version.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Envelope {
            format: ENVELOPE_FORMAT,
            kind: kind.into(),
            payload,
        }
    }

    /// Serialize a value into a new envelope.
    pub fn encode<T: Serialize>(kind: &str, value: &T) -> Result<Self, TransportError> {
        let payload =
            serde_json::to_value(value).map_err(|source| TransportError::encode(kind, source))?;
        Ok(Envelope::new(kind, payload))
    }

    /// Check the format version and kind tag, then decode the payload.
    pub fn open<T: DeserializeOwned>(&self, kind: &str) -> Result<T, TransportError> {
        self.expect(kind)?;
        serde_json::from_value(self.payload.clone())
            .map_err(|source| TransportError::decode(kind, source))
    }

    /// Verify the envelope was written at a format this build reads.
    pub fn check_format(&self) -> Result<(), TransportError> {
        if self.format != ENVELOPE_FORMAT {
            return Err(TransportError::UnsupportedFormat {
                supported: ENVELOPE_FORMAT,
                found: self.format,
            });
        }
        Ok(())
    }

    /// Verify format version and kind tag without decoding the payload.
    pub fn expect(&self, kind: &str) -> Result<(), TransportError> {
        self.check_format()?;
        if self.kind != kind {
            return Err(TransportError::KindMismatch {
                expected: kind.to_string(),
                found: self.kind.clone(),
            });
        }
        Ok(())
    }

    /// Canonical byte form (JSON).
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|source| TransportError::encode(self.kind.clone(), source))
    }

    /// Decode an envelope from its canonical byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(bytes).map_err(|source| TransportError::decode("envelope", source))
    }
}

/// Marker for values allowed to cross a process boundary.
///
/// A value is transportable exactly when it round-trips through an
/// [`Envelope`] payload, which is what the `Serialize + DeserializeOwned`
/// bounds say. Live handles (HTTP clients, child processes, sockets) do
/// not qualify; they are created inside a factory's `build` and stay on
/// the host that built them.
pub trait Transportable: Serialize + DeserializeOwned + Send + Sync {}

impl<T> Transportable for T where T: Serialize + DeserializeOwned + Send + Sync {}
