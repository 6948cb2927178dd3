//! Body editing through an external editor
//!
//! Node bodies are opaque rich-text payloads. This service hands one to
//! the configured editor via a temp file and reads back the result.

use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::infrastructure::traits::{Editor, FileSystem};

pub struct BodyEditorService {
    fs: Arc<dyn FileSystem>,
    editor: Arc<dyn Editor>,
}

impl BodyEditorService {
    pub fn new(fs: Arc<dyn FileSystem>, editor: Arc<dyn Editor>) -> Self {
        Self { fs, editor }
    }

    /// Let the user edit `current` and return the edited text.
    pub fn edit(&self, current: &str) -> ApplicationResult<String> {
        let staging = tempfile::Builder::new()
            .prefix("mindtree-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| ApplicationError::OperationFailed {
                context: "create temp file for body".into(),
                source: Box::new(e),
            })?;
        let path = staging.path();

        self.fs
            .write(path, current)
            .with_path_context("write body", path)?;
        self.editor
            .open(path)
            .with_path_context("run editor on", path)?;
        let edited = self
            .fs
            .read_to_string(path)
            .with_path_context("read body", path)?;

        // editors append a final newline the payload never had
        let edited = match edited.strip_suffix('\n') {
            Some(stripped) if !current.ends_with('\n') => stripped.to_string(),
            _ => edited,
        };
        debug!(changed = edited != current, "body edited");
        Ok(edited)
    }
}
