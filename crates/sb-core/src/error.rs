//! Error types for scene parsing, host access, building and serializing.

use crate::host::HostKind;
use crate::id::HostId;

/// A scene description could not be turned into typed nodes.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a node or an array of nodes, found {0}")]
    NotAScene(&'static str),

    #[error("{path}: node has no `type` tag")]
    MissingType { path: String },

    #[error("{path}: unsupported node type `{tag}`")]
    UnknownNodeType { path: String, tag: String },

    #[error("{path}: {source}")]
    Shape {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by a host implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("host object {0} does not exist")]
    NotFound(HostId),

    #[error("font {0} is not available on this host")]
    FontUnavailable(String),

    /// Font-dependent property touched before the font was loaded.
    #[error("font {font} must be loaded before editing text on {id}")]
    FontNotLoaded { id: HostId, font: String },

    #[error("cannot group zero objects")]
    EmptyGroup,

    #[error("{0}")]
    InvalidOperation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("group `{name}` has no children")]
    EmptyGroup { name: String },

    #[error("scene has no nodes")]
    EmptyScene,
}

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("cannot serialize host object {id} of type {kind:?}")]
    UnsupportedHostType { id: HostId, kind: HostKind },
}
