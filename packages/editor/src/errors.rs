//! Error types for the replica

use convo_document::{FieldError, ResolveError};
use thiserror::Error;

use crate::transport::TransportError;

/// Why a mutation could not be applied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    /// The ref names structure this replica does not have.
    #[error("Replica out of sync: {0}")]
    Desync(#[from] ResolveError),

    #[error("Rejected field write: {0}")]
    Field(#[from] FieldError),

    #[error("Cannot create {found:?} in a collection of {expected}")]
    ObjectTypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Malformed mutation: {0}")]
    Malformed(String),
}

impl MutationError {
    /// Protocol defect: the replica no longer matches the server.
    ///
    /// Every other variant is a bad payload that left the document untouched.
    pub fn is_desync(&self) -> bool {
        matches!(self, MutationError::Desync(_))
    }
}

/// Errors surfaced by a chat session
#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Malformed server message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Replica is out of sync; waiting for a fresh snapshot")]
    AwaitingSnapshot,

    #[error("Session is closed")]
    Closed,
}

impl ReplicaError {
    pub fn is_desync(&self) -> bool {
        matches!(self, ReplicaError::Mutation(e) if e.is_desync())
    }
}
