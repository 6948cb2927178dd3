//! mindtree: a mind-map tree state engine.
//!
//! A [`domain::DocumentTree`] holds the canonical, serializable content.
//! A [`domain::PresentationHierarchy`] mirrors it with collapse state and
//! layout anchors for a renderer. [`application::TreeManager`] edits the
//! document and regenerates the hierarchy without losing view state.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{TreeManager, UpdateEvent};
pub use domain::{DocumentTree, PresentationHierarchy, PresentationKey, ViewOptions};
