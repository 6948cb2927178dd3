//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("invalid document {path}: {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: DomainError,
    },

    #[error("document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("document already exists: {0}")]
    DocumentExists(PathBuf),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("operation rejected: {0}")]
    Rejected(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
