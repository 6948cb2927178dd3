//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{BodyEditorService, DocumentService};
use crate::config::Settings;
use crate::infrastructure::traits::{CommandEditor, Editor, FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Editor abstraction
    pub editor: Arc<dyn Editor>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let editor = Arc::new(CommandEditor::new(settings.editor.clone()));
        Self::with_deps(settings, Arc::new(RealFileSystem), editor)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>, editor: Arc<dyn Editor>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            editor,
        }
    }

    pub fn documents(&self) -> DocumentService {
        DocumentService::new(self.fs.clone(), self.settings.clone())
    }

    pub fn body_editor(&self) -> BodyEditorService {
        BodyEditorService::new(self.fs.clone(), self.editor.clone())
    }
}
