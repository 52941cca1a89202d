//! Error types for resource construction and transport.

use thiserror::Error;

/// Errors raised while packing a deferred resource for transport or
/// rebuilding one on the receiving side.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The proxy holds a live resource with no transportable form.
    ///
    /// Pack the proxy before its first access, or give the factory a
    /// snapshot implementation if the resource is plain data.
    #[error("Resource of kind '{kind}' is live and has no transportable form")]
    NonTransportableResource {
        /// Factory kind tag of the offending resource.
        kind: String,
    },

    /// The factory or a resource snapshot failed to serialize.
    #[error("Failed to encode '{kind}' for transport: {source}")]
    Encode {
        /// Kind tag of the value being encoded.
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// An envelope payload failed to deserialize.
    #[error("Failed to decode '{kind}' from transport: {source}")]
    Decode {
        /// Kind tag of the value being decoded.
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// A resource snapshot was present but the factory could not rebuild
    /// the resource from it.
    #[error("Failed to restore resource of kind '{kind}': {source}")]
    Restore {
        /// Factory kind tag.
        kind: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The envelope was written by a format this build does not read.
    #[error("Unsupported envelope format {found} (this build reads format {supported})")]
    UnsupportedFormat {
        /// Format version this build understands.
        supported: u32,
        /// Format version found in the envelope.
        found: u32,
    },

    /// The envelope carries a different kind of payload than expected.
    #[error("Envelope kind mismatch: expected '{expected}', found '{found}'")]
    KindMismatch {
        /// Kind the caller asked for.
        expected: String,
        /// Kind recorded in the envelope.
        found: String,
    },
}

impl TransportError {
    pub(crate) fn encode(kind: impl Into<String>, source: serde_json::Error) -> Self {
        TransportError::Encode {
            kind: kind.into(),
            source,
        }
    }

    pub(crate) fn decode(kind: impl Into<String>, source: serde_json::Error) -> Self {
        TransportError::Decode {
            kind: kind.into(),
            source,
        }
    }

    /// Check if this is the live-resource transport failure.
    pub fn is_non_transportable(&self) -> bool {
        matches!(self, TransportError::NonTransportableResource { .. })
    }

    /// Check if this is a kind-tag mismatch.
    pub fn is_kind_mismatch(&self) -> bool {
        matches!(self, TransportError::KindMismatch { .. })
    }

    /// Check if this is a format-version mismatch.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, TransportError::UnsupportedFormat { .. })
    }
}

/// Error returned when a factory fails to produce its resource.
///
/// The proxy stays empty after this; the next access runs the factory
/// again.
#[derive(Debug, Error)]
#[error("Failed to construct resource of kind '{kind}': {source}")]
pub struct ConstructionError {
    kind: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ConstructionError {
    /// Wrap a factory failure under its kind tag.
    pub fn new(kind: impl Into<String>, source: anyhow::Error) -> Self {
        ConstructionError {
            kind: kind.into(),
            source: source.into(),
        }
    }

    /// Factory kind tag of the resource that failed to construct.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}
