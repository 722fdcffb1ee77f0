//! Error types for the document crate

use thiserror::Error;

use crate::{NodeKind, SegmentPath};

/// A ref that does not match the replica.
///
/// Every variant means the server addressed something this client does not
/// have. The replica is out of sync and must be rebuilt from a snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("malformed segment path: {0}")]
    MalformedPath(SegmentPath),

    #[error("{parent:?} has no collection named {collection:?}")]
    UnknownCollection { parent: NodeKind, collection: String },

    #[error("no element {id:?} in collection {collection:?}")]
    NotFound { collection: String, id: String },
}

/// A field write the schema refuses. Nothing is written when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("{kind:?} has no field {key:?}")]
    UnknownField { kind: NodeKind, key: String },

    #[error("invalid value for {kind:?}.{key}: {reason}")]
    InvalidValue {
        kind: NodeKind,
        key: String,
        reason: String,
    },

    #[error("{kind:?}.{key} is not a string field")]
    NotAString { kind: NodeKind, key: String },

    #[error("{kind:?}.{key} is a nested collection and cannot be assigned")]
    Collection { kind: NodeKind, key: String },
}
