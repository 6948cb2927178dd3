//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Editor)
//! but are themselves concrete structs, not traits.

mod body_editor;
mod document;

pub use body_editor::BodyEditorService;
pub use document::{DocumentService, DocumentStats};
