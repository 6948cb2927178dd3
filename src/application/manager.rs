//! Tree manager: the editing session.
//!
//! Owns the document, its live presentation hierarchy and the renderer
//! callback. Structural edits follow one pathway: snapshot the view
//! state, mutate the document, regenerate the hierarchy, notify.
//! Visibility toggles and in-place edits skip regeneration.
//!
//! Invalid requests (root deletion, cycles, stale handles) are expected
//! user mistakes. They return `false`/`None`, log a warning and leave
//! the session untouched.

use std::fmt;

use tracing::{debug, instrument, warn};

use crate::domain::{
    regenerate, regenerate_reloaded, DocumentNode, DocumentRecord, DocumentTree, DomainError,
    DomainResult, NodeKey, Point, PresentationHierarchy, PresentationKey, RegenerationReport,
    Size, Snapshot, TrackingId, ViewOptions,
};

/// Handed to the update callback after every mutating operation.
#[derive(Debug, Clone, Copy)]
pub struct UpdateEvent<'a> {
    /// Node the renderer should treat as the origin of the change
    pub source: PresentationKey,
    pub hierarchy: &'a PresentationHierarchy,
    pub document: &'a DocumentTree,
}

pub type UpdateCallback = Box<dyn FnMut(UpdateEvent<'_>)>;

pub struct TreeManager {
    document: DocumentTree,
    hierarchy: PresentationHierarchy,
    options: ViewOptions,
    on_update: Option<UpdateCallback>,
}

impl fmt::Debug for TreeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeManager")
            .field("document", &self.document)
            .field("hierarchy", &self.hierarchy)
            .field("options", &self.options)
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}

impl TreeManager {
    pub fn new(document: DocumentTree, options: ViewOptions) -> Self {
        let hierarchy = PresentationHierarchy::build(&document, &options);
        Self {
            document,
            hierarchy,
            options,
            on_update: None,
        }
    }

    pub fn from_json(json: &str, options: ViewOptions) -> DomainResult<Self> {
        Ok(Self::new(DocumentTree::from_json(json)?, options))
    }

    pub fn root(&self) -> PresentationKey {
        self.hierarchy.root()
    }

    pub fn document(&self) -> &DocumentTree {
        &self.document
    }

    pub fn hierarchy(&self) -> &PresentationHierarchy {
        &self.hierarchy
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Replace the notification callback.
    pub fn set_update_callback(&mut self, callback: impl FnMut(UpdateEvent<'_>) + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    pub fn clear_update_callback(&mut self) {
        self.on_update = None;
    }

    // ------------------------------------------------------------
    // Structural mutations
    // ------------------------------------------------------------

    /// Append a new unsaved node under `parent` and return its
    /// presentation node in the regenerated hierarchy.
    ///
    /// The new node is resolved through its document key, so siblings
    /// sharing its name do not matter. `parent` is stale afterwards.
    #[instrument(level = "debug", skip(self, name, body))]
    pub fn add_child(
        &mut self,
        parent: PresentationKey,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> Option<PresentationKey> {
        let Some(parent_data) = self.hierarchy.data(parent) else {
            warn!(%parent, "add_child: parent is not in the current hierarchy");
            return None;
        };

        let snapshot = Snapshot::capture(&self.hierarchy, &self.document);
        let child = match self
            .document
            .append_child(parent_data, DocumentNode::new(name, body))
        {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "add_child rejected");
                return None;
            }
        };

        self.regenerate_from(snapshot, Some(parent_data));
        self.notify_data(parent_data);
        self.hierarchy.key_for(child)
    }

    /// Remove `node` and its subtree. The root cannot be deleted.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&mut self, node: PresentationKey) -> bool {
        let Some(data) = self.hierarchy.data(node) else {
            warn!(%node, "delete_node: node is not in the current hierarchy");
            return false;
        };
        let Some(parent_data) = self.document.get(data).and_then(DocumentNode::parent) else {
            warn!(%node, "delete_node: refusing to delete the root");
            return false;
        };

        let snapshot = Snapshot::capture(&self.hierarchy, &self.document);
        if let Err(e) = self.document.remove_subtree(data) {
            warn!(error = %e, "delete_node rejected");
            return false;
        }

        self.regenerate_from(snapshot, Some(parent_data));
        self.notify_data(parent_data);
        true
    }

    /// Re-parent the whole subtree at `node` as the last child of
    /// `new_parent`, keeping identity, collapse state and anchors.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, node: PresentationKey, new_parent: PresentationKey) -> bool {
        let (Some(data), Some(target)) = (self.hierarchy.data(node), self.hierarchy.data(new_parent))
        else {
            warn!(%node, %new_parent, "move_node: handle is not in the current hierarchy");
            return false;
        };
        if self.hierarchy.parent(node).is_none() {
            warn!(%node, "move_node: refusing to move the root");
            return false;
        }
        if self.hierarchy.is_self_or_descendant(node, new_parent) {
            warn!(%node, %new_parent, "move_node: target lies inside the moved subtree");
            return false;
        }

        let snapshot = Snapshot::capture(&self.hierarchy, &self.document);
        if let Err(e) = self.document.move_subtree(data, target) {
            warn!(error = %e, "move_node rejected");
            return false;
        }

        self.regenerate_from(snapshot, Some(target));
        self.notify_data(target);
        true
    }

    /// Swap in a different document, e.g. one reloaded from storage.
    ///
    /// View state carries over by persisted id, then by name. Nodes with
    /// no earlier state collapse from the configured expand depth.
    #[instrument(level = "debug", skip_all, fields(nodes = document.node_count()))]
    pub fn replace_document(&mut self, document: DocumentTree) -> RegenerationReport {
        let snapshot = Snapshot::capture(&self.hierarchy, &self.document).forget_node_keys();
        self.document = document;
        let report = regenerate_reloaded(
            &mut self.hierarchy,
            &self.document,
            snapshot,
            self.options.expand_depth,
        );
        self.notify(self.hierarchy.root());
        report
    }

    /// Parse `json` and replace the document. Malformed input leaves the
    /// session untouched.
    pub fn replace_document_json(&mut self, json: &str) -> DomainResult<RegenerationReport> {
        let document = DocumentTree::from_json(json)?;
        Ok(self.replace_document(document))
    }

    // ------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------

    /// First node below `from` (pre-order, hidden nodes included) named `name`.
    pub fn find_by_name(&self, from: PresentationKey, name: &str) -> Option<PresentationKey> {
        let document = &self.document;
        self.hierarchy.find(from, |_, node| {
            document.get(node.data()).is_some_and(|d| d.name == name)
        })
    }

    /// First node below `from` whose persisted id is `id`.
    pub fn find_by_id(&self, from: PresentationKey, id: &str) -> Option<PresentationKey> {
        let document = &self.document;
        self.hierarchy.find(from, |_, node| {
            document
                .get(node.data())
                .is_some_and(|d| d.id.as_deref() == Some(id))
        })
    }

    /// Every node below and including `from`, regardless of visibility.
    pub fn all_nodes(&self, from: PresentationKey) -> Vec<PresentationKey> {
        self.hierarchy.all_nodes(from)
    }

    pub fn document_node(&self, node: PresentationKey) -> Option<&DocumentNode> {
        self.hierarchy.data(node).and_then(|d| self.document.get(d))
    }

    pub fn name(&self, node: PresentationKey) -> Option<&str> {
        self.document_node(node).map(|n| n.name.as_str())
    }

    pub fn body(&self, node: PresentationKey) -> Option<&str> {
        self.document_node(node).map(|n| n.body.as_str())
    }

    // ------------------------------------------------------------
    // In-place edits (no regeneration)
    // ------------------------------------------------------------

    pub fn toggle(&mut self, node: PresentationKey) -> bool {
        let changed = self.hierarchy.toggle(node);
        if changed {
            self.notify(node);
        }
        changed
    }

    pub fn expand(&mut self, node: PresentationKey) -> bool {
        let changed = self.hierarchy.expand(node);
        if changed {
            self.notify(node);
        }
        changed
    }

    pub fn collapse(&mut self, node: PresentationKey) -> bool {
        let changed = self.hierarchy.collapse(node);
        if changed {
            self.notify(node);
        }
        changed
    }

    pub fn rename(&mut self, node: PresentationKey, name: impl Into<String>) -> bool {
        self.edit_in_place(node, |document, data| document.rename(data, name))
    }

    /// Store an opaque body payload; its content is not inspected.
    pub fn set_body(&mut self, node: PresentationKey, body: impl Into<String>) -> bool {
        self.edit_in_place(node, |document, data| document.set_body(data, body))
    }

    pub fn set_prior_position(&mut self, node: PresentationKey, position: Point) -> bool {
        self.hierarchy.set_prior_position(node, position)
    }

    pub fn set_cached_size(&mut self, node: PresentationKey, size: Size) -> bool {
        self.hierarchy.set_cached_size(node, size)
    }

    pub fn tracking_id(&mut self, node: PresentationKey) -> Option<TrackingId> {
        self.hierarchy.ensure_tracking_id(node)
    }

    // ------------------------------------------------------------
    // Persistence boundary
    // ------------------------------------------------------------

    pub fn to_record(&self) -> DocumentRecord {
        self.document.to_record()
    }

    pub fn to_json(&self) -> DomainResult<String> {
        self.document.to_json()
    }

    /// Give unsaved nodes a persisted id, returning how many were assigned.
    ///
    /// Node keys are untouched, so view state and live handles stay valid.
    pub fn assign_missing_ids(&mut self, generate: impl FnMut() -> String) -> usize {
        self.document.assign_missing_ids(generate)
    }

    // ------------------------------------------------------------

    fn edit_in_place(
        &mut self,
        node: PresentationKey,
        edit: impl FnOnce(&mut DocumentTree, NodeKey) -> Result<(), DomainError>,
    ) -> bool {
        let Some(data) = self.hierarchy.data(node) else {
            warn!(%node, "edit: node is not in the current hierarchy");
            return false;
        };
        if let Err(e) = edit(&mut self.document, data) {
            warn!(error = %e, "edit rejected");
            return false;
        }
        self.notify(node);
        true
    }

    fn regenerate_from(&mut self, snapshot: Snapshot, source: Option<NodeKey>) -> RegenerationReport {
        let report = regenerate(&mut self.hierarchy, &self.document, snapshot, source);
        debug!(nodes = self.hierarchy.len(), "hierarchy regenerated");
        report
    }

    fn notify_data(&mut self, data: NodeKey) {
        if let Some(key) = self.hierarchy.key_for(data) {
            self.notify(key);
        }
    }

    fn notify(&mut self, source: PresentationKey) {
        if let Some(callback) = self.on_update.as_mut() {
            callback(UpdateEvent {
                source,
                hierarchy: &self.hierarchy,
                document: &self.document,
            });
        }
    }
}
