//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::document::NodeKey;

/// Domain errors represent structural-integrity violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    #[error("unknown node: {0}")]
    UnknownNode(NodeKey),

    #[error("the root node cannot be detached")]
    RootNode,

    #[error("cycle detected: {node} cannot be moved under {target}")]
    CycleDetected { node: NodeKey, target: NodeKey },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DomainError {
    /// Create a malformed-document error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
