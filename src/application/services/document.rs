//! Document persistence service
//!
//! Loads and stores mind-map documents as JSON through the filesystem
//! boundary. Saving stands in for the remote store: unsaved nodes get
//! a persisted id (UUID v4) before the document is written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, TreeManager};
use crate::config::Settings;
use crate::domain::DocumentTree;
use crate::infrastructure::traits::FileSystem;

/// Root name given to documents created without one.
pub const DEFAULT_ROOT_NAME: &str = "root";

fn new_node_id() -> String {
    Uuid::new_v4().to_string()
}

/// Summary numbers for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub nodes: usize,
    pub max_depth: usize,
    pub leaves: usize,
    /// Nodes without a persisted id
    pub unsaved: usize,
}

impl DocumentStats {
    pub fn of(document: &DocumentTree) -> Self {
        Self {
            nodes: document.node_count(),
            max_depth: document.max_depth(),
            leaves: document.leaf_nodes().len(),
            unsaved: document.iter().filter(|(_, n)| n.id.is_none()).count(),
        }
    }
}

pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl DocumentService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Resolve the document to work on, see [`Settings::resolve_document`].
    pub fn resolve_path(&self, explicit: Option<&Path>) -> ApplicationResult<PathBuf> {
        self.settings
            .resolve_document(explicit)
            .ok_or_else(|| ApplicationError::Config {
                message: "no document given and no default_document configured".into(),
            })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<DocumentTree> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::DocumentNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read document", path)?;
        let document =
            DocumentTree::from_json(&content).map_err(|source| ApplicationError::InvalidDocument {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(nodes = document.node_count(), "document loaded");
        Ok(document)
    }

    /// Load `path` into an editing session using the configured view options.
    pub fn open(&self, path: &Path) -> ApplicationResult<TreeManager> {
        let document = self.load(path)?;
        Ok(TreeManager::new(document, self.settings.view_options()))
    }

    /// Write `document` to `path`, returning how many ids were assigned.
    #[instrument(level = "debug", skip(self, document))]
    pub fn save(&self, path: &Path, document: &mut DocumentTree) -> ApplicationResult<usize> {
        let assigned = if self.settings.store.assign_ids {
            document.assign_missing_ids(new_node_id)
        } else {
            0
        };
        self.write(path, document)?;
        debug!(assigned, "document saved");
        Ok(assigned)
    }

    /// Save the session's document in place.
    ///
    /// Ids are assigned on the live document, so view state, handles and
    /// the update callback survive. A failed write leaves the session
    /// usable.
    #[instrument(level = "debug", skip(self, session))]
    pub fn save_session(&self, path: &Path, session: &mut TreeManager) -> ApplicationResult<usize> {
        let assigned = if self.settings.store.assign_ids {
            session.assign_missing_ids(new_node_id)
        } else {
            0
        };
        self.write(path, session.document())?;
        debug!(assigned, "session saved");
        Ok(assigned)
    }

    fn write(&self, path: &Path, document: &DocumentTree) -> ApplicationResult<()> {
        let json = if self.settings.store.pretty {
            document.to_json_pretty()?
        } else {
            document.to_json()?
        };

        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write_atomic(path, &json)
            .with_path_context("write document", path)
    }

    /// Create a document holding a single root node.
    #[instrument(level = "debug", skip(self))]
    pub fn create(
        &self,
        path: &Path,
        root_name: Option<&str>,
        force: bool,
    ) -> ApplicationResult<DocumentTree> {
        if self.fs.exists(path) && !force {
            return Err(ApplicationError::DocumentExists(path.to_path_buf()));
        }
        let mut document = DocumentTree::new(root_name.unwrap_or(DEFAULT_ROOT_NAME), "");
        self.save(path, &mut document)?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentRecord;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    fn service(settings: Settings) -> DocumentService {
        DocumentService::new(Arc::new(RealFileSystem), Arc::new(settings))
    }

    #[test]
    fn given_missing_file_when_loading_then_document_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let result = service(Settings::default()).load(&path);

        assert!(matches!(result, Err(ApplicationError::DocumentNotFound(p)) if p == path));
    }

    #[test]
    fn given_store_without_ids_when_saving_then_nodes_stay_unsaved() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");
        let mut settings = Settings::default();
        settings.store.assign_ids = false;
        let mut document = DocumentTree::from_record(
            &DocumentRecord::new("root").with_children(vec![DocumentRecord::new("a")]),
        );

        let assigned = service(settings).save(&path, &mut document).unwrap();

        assert_eq!(assigned, 0);
        assert_eq!(DocumentStats::of(&document).unsaved, 2);
    }

    #[test]
    fn given_document_when_computing_stats_then_counts_shape() {
        let document = DocumentTree::from_record(&DocumentRecord::new("root").with_children(vec![
            DocumentRecord::new("a").with_children(vec![DocumentRecord::new("a1")]),
            DocumentRecord::new("b").with_id("b-1"),
        ]));

        let stats = DocumentStats::of(&document);

        assert_eq!(
            stats,
            DocumentStats {
                nodes: 4,
                max_depth: 2,
                leaves: 2,
                unsaved: 3,
            }
        );
    }
}
