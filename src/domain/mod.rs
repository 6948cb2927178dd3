//! Domain layer: document tree, presentation hierarchy, regeneration
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod error;
pub mod presentation;
pub mod record;
pub mod regenerate;

pub use document::{DocumentNode, DocumentTree, NodeKey};
pub use error::{DomainError, DomainResult};
pub use presentation::{
    Children, Point, PresentationHierarchy, PresentationKey, PresentationNode, Size, TrackingId,
    ViewOptions,
};
pub use record::DocumentRecord;
pub use regenerate::{regenerate, regenerate_reloaded, NodeState, RegenerationReport, Snapshot};
