//! Regeneration engine.
//!
//! After a structural document change the presentation hierarchy is
//! thrown away and rebuilt. Per-node view state (collapse flag, tracking
//! id, layout anchors) is captured beforehand in a [`Snapshot`] and
//! transplanted onto the matching nodes of the new hierarchy.
//!
//! Matching runs in tiers:
//! 1. same [`NodeKey`] (the node survived the edit),
//! 2. same persisted document id,
//! 3. same name, same-named entries consumed in traversal order.
//!
//! Tier 1 runs over the whole tree before tiers 2 and 3 and each entry
//! is claimed at most once, so a surviving node never loses its state to
//! a look-alike. Tiers 2 and 3 only matter when the document was
//! replaced wholesale and keys mean nothing any more.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument};

use crate::domain::document::{DocumentTree, NodeKey};
use crate::domain::presentation::{
    Point, PresentationHierarchy, PresentationKey, Size, TrackingId,
};

/// View state of one presentation node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub prior_position: Option<Point>,
    pub cached_size: Option<Size>,
    pub collapsed: bool,
    pub tracking_id: Option<TrackingId>,
}

/// View state of a whole hierarchy, captured before a document mutation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<Option<NodeState>>,
    by_data: HashMap<NodeKey, usize>,
    by_id: HashMap<String, VecDeque<usize>>,
    by_name: HashMap<String, VecDeque<usize>>,
}

impl Snapshot {
    /// Record the state of every node, hidden subtrees included.
    #[instrument(level = "trace", skip_all)]
    pub fn capture(hierarchy: &PresentationHierarchy, document: &DocumentTree) -> Self {
        let mut snapshot = Self::default();
        for (_, node) in hierarchy.iter_from(hierarchy.root()) {
            let Some(doc_node) = document.get(node.data()) else {
                continue;
            };
            let idx = snapshot.entries.len();
            snapshot.by_data.insert(node.data(), idx);
            if let Some(id) = &doc_node.id {
                snapshot.by_id.entry(id.clone()).or_default().push_back(idx);
            }
            snapshot
                .by_name
                .entry(doc_node.name.clone())
                .or_default()
                .push_back(idx);
            snapshot.entries.push(Some(NodeState {
                prior_position: node.prior_position,
                cached_size: node.cached_size,
                collapsed: node.children().is_collapsed(),
                tracking_id: node.tracking_id(),
            }));
        }
        snapshot
    }

    /// Drop key-based matching, for when the document is replaced by an
    /// unrelated tree whose keys may collide with the old ones.
    pub fn forget_node_keys(mut self) -> Self {
        self.by_data.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State recorded for document node `data`, if still unclaimed.
    pub fn state_of(&self, data: NodeKey) -> Option<&NodeState> {
        let idx = *self.by_data.get(&data)?;
        self.entries.get(idx)?.as_ref()
    }

    fn claim_by_data(&mut self, data: NodeKey) -> Option<NodeState> {
        let idx = *self.by_data.get(&data)?;
        self.entries.get_mut(idx)?.take()
    }

    fn claim_by_id(&mut self, id: &str) -> Option<NodeState> {
        claim_next(self.by_id.get_mut(id), &mut self.entries)
    }

    fn claim_by_name(&mut self, name: &str) -> Option<NodeState> {
        claim_next(self.by_name.get_mut(name), &mut self.entries)
    }
}

fn claim_next(
    queue: Option<&mut VecDeque<usize>>,
    entries: &mut [Option<NodeState>],
) -> Option<NodeState> {
    let queue = queue?;
    while let Some(idx) = queue.pop_front() {
        if let Some(state) = entries.get_mut(idx).and_then(Option::take) {
            return Some(state);
        }
    }
    None
}

/// How the nodes of a regenerated hierarchy got their state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenerationReport {
    pub by_key: usize,
    pub by_id: usize,
    pub by_name: usize,
    /// Nodes with no snapshot entry, started expanded at the source anchor
    pub fresh: usize,
}

/// Rebuild `hierarchy` from `document` and restore `snapshot` onto it.
///
/// `source` is the document node the triggering edit happened at; fresh
/// nodes take its pre-edit position as their prior position so the
/// renderer animates them in from there.
#[instrument(level = "debug", skip(hierarchy, document, snapshot))]
pub fn regenerate(
    hierarchy: &mut PresentationHierarchy,
    document: &DocumentTree,
    snapshot: Snapshot,
    source: Option<NodeKey>,
) -> RegenerationReport {
    let (report, _) = rebuild_and_restore(hierarchy, document, snapshot, source);
    debug!(?report, "regenerated presentation hierarchy");
    report
}

/// Regenerate after the document was replaced by a reloaded one.
///
/// Matched nodes keep their state as in [`regenerate`]; fresh nodes at
/// `expand_depth` or deeper start collapsed, as on a first load.
#[instrument(level = "debug", skip(hierarchy, document, snapshot))]
pub fn regenerate_reloaded(
    hierarchy: &mut PresentationHierarchy,
    document: &DocumentTree,
    snapshot: Snapshot,
    expand_depth: Option<usize>,
) -> RegenerationReport {
    let (report, fresh) = rebuild_and_restore(hierarchy, document, snapshot, None);
    if let Some(limit) = expand_depth {
        for key in fresh {
            if hierarchy.depth(key).is_some_and(|depth| depth >= limit) {
                hierarchy.collapse(key);
            }
        }
    }
    debug!(?report, "regenerated reloaded document");
    report
}

/// Rebuild, restore matched state and return the keys of fresh nodes.
fn rebuild_and_restore(
    hierarchy: &mut PresentationHierarchy,
    document: &DocumentTree,
    mut snapshot: Snapshot,
    source: Option<NodeKey>,
) -> (RegenerationReport, Vec<PresentationKey>) {
    let source_anchor = source
        .and_then(|key| snapshot.state_of(key))
        .and_then(|state| state.prior_position);

    hierarchy.rebuild(document);

    let order: Vec<(PresentationKey, NodeKey)> = hierarchy
        .iter_from(hierarchy.root())
        .map(|(key, node)| (key, node.data()))
        .collect();

    let mut report = RegenerationReport::default();
    let mut fresh = Vec::new();
    let mut unmatched = Vec::new();
    for (key, data) in order {
        match snapshot.claim_by_data(data) {
            Some(state) => {
                apply(hierarchy, key, state);
                report.by_key += 1;
            }
            None => unmatched.push((key, data)),
        }
    }

    for (key, data) in unmatched {
        let Some(doc_node) = document.get(data) else {
            continue;
        };
        if let Some(state) = doc_node.id.as_deref().and_then(|id| snapshot.claim_by_id(id)) {
            apply(hierarchy, key, state);
            report.by_id += 1;
        } else if let Some(state) = snapshot.claim_by_name(&doc_node.name) {
            apply(hierarchy, key, state);
            report.by_name += 1;
        } else {
            hierarchy.restore_state(key, None, source_anchor, None);
            report.fresh += 1;
            fresh.push(key);
        }
    }

    (report, fresh)
}

fn apply(hierarchy: &mut PresentationHierarchy, key: PresentationKey, state: NodeState) {
    hierarchy.restore_state(
        key,
        state.tracking_id,
        state.prior_position,
        state.cached_size,
    );
    if state.collapsed {
        hierarchy.collapse(key);
    }
}
