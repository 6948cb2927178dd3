//! Presentation hierarchy: the document tree as the renderer sees it.
//!
//! One [`PresentationNode`] per document node, each carrying its
//! expand/collapse state and the layout anchors the renderer animates
//! from. The hierarchy is derived data: it is rebuilt wholesale after
//! structural document changes (see [`crate::domain::regenerate`]) and
//! only toggled in place for visibility changes.

use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::document::{DocumentTree, NodeKey};

/// Handle of a presentation node.
///
/// Handles die with the hierarchy they were issued by: after a
/// regeneration every lookup with an older handle returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresentationKey(Index);

impl fmt::Display for PresentationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "@{slot}.{generation}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Key of a rendered element, distinct from the persisted document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackingId(u64);

impl TrackingId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Child slot of a presentation node.
///
/// A node with document children is either expanded (`Visible`) or
/// collapsed (`Hidden`), never both. Leaves hold `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Children {
    #[default]
    None,
    Visible(Vec<PresentationKey>),
    Hidden(Vec<PresentationKey>),
}

impl Children {
    /// Child keys regardless of visibility.
    pub fn keys(&self) -> &[PresentationKey] {
        match self {
            Self::None => &[],
            Self::Visible(keys) | Self::Hidden(keys) => keys,
        }
    }

    pub fn visible(&self) -> Option<&[PresentationKey]> {
        match self {
            Self::Visible(keys) => Some(keys),
            _ => None,
        }
    }

    pub fn hidden(&self) -> Option<&[PresentationKey]> {
        match self {
            Self::Hidden(keys) => Some(keys),
            _ => None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Self::Hidden(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Move visible children into the hidden slot. Returns true on change.
    pub fn collapse(&mut self) -> bool {
        match std::mem::take(self) {
            Self::Visible(keys) => {
                *self = Self::Hidden(keys);
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Move hidden children into the visible slot. Returns true on change.
    pub fn expand(&mut self) -> bool {
        match std::mem::take(self) {
            Self::Hidden(keys) => {
                *self = Self::Visible(keys);
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Flip between expanded and collapsed. Leaves do not toggle.
    pub fn toggle(&mut self) -> bool {
        self.collapse() || self.expand()
    }
}

/// A node of the presentation hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationNode {
    data: NodeKey,
    parent: Option<PresentationKey>,
    children: Children,
    tracking_id: Option<TrackingId>,
    /// Position from the last layout pass, used as animation origin
    pub prior_position: Option<Point>,
    /// Rendered label size, used for link geometry
    pub cached_size: Option<Size>,
}

impl PresentationNode {
    fn new(data: NodeKey, parent: Option<PresentationKey>) -> Self {
        Self {
            data,
            parent,
            children: Children::None,
            tracking_id: None,
            prior_position: None,
            cached_size: None,
        }
    }

    /// The document node this presentation node shows.
    pub fn data(&self) -> NodeKey {
        self.data
    }

    pub fn parent(&self) -> Option<PresentationKey> {
        self.parent
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn tracking_id(&self) -> Option<TrackingId> {
        self.tracking_id
    }
}

/// Initial view state applied when a hierarchy is first built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewOptions {
    /// Nodes at this depth or deeper start collapsed; None expands all
    pub expand_depth: Option<usize>,
    /// Prior position given to the root so the first layout has an origin
    pub root_anchor: Point,
}

/// Arena-based presentation hierarchy.
#[derive(Debug, Clone)]
pub struct PresentationHierarchy {
    arena: Arena<PresentationNode>,
    root: PresentationKey,
    by_data: HashMap<NodeKey, PresentationKey>,
    last_tracking_id: u64,
}

impl PresentationHierarchy {
    /// Build a fresh hierarchy for `document` and apply `options`.
    #[instrument(level = "debug", skip_all, fields(nodes = document.node_count()))]
    pub fn build(document: &DocumentTree, options: &ViewOptions) -> Self {
        let mut arena = Arena::with_capacity(document.node_count());
        let mut by_data = HashMap::with_capacity(document.node_count());
        let root = populate(&mut arena, &mut by_data, document);
        let mut hierarchy = Self {
            arena,
            root,
            by_data,
            last_tracking_id: 0,
        };
        if let Some(depth) = options.expand_depth {
            hierarchy.collapse_from_depth(depth);
        }
        hierarchy.set_prior_position(root, options.root_anchor);
        hierarchy
    }

    /// Discard every node and rebuild from `document`, all expanded.
    ///
    /// Old entries are removed one by one so the arena bumps its
    /// generation and stale handles cannot alias the new nodes. The
    /// tracking-id counter survives.
    pub(crate) fn rebuild(&mut self, document: &DocumentTree) {
        let stale: Vec<Index> = self.arena.iter().map(|(idx, _)| idx).collect();
        for idx in stale {
            self.arena.remove(idx);
        }
        self.by_data.clear();
        self.root = populate(&mut self.arena, &mut self.by_data, document);
    }

    pub fn root(&self) -> PresentationKey {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, key: PresentationKey) -> bool {
        self.arena.contains(key.0)
    }

    pub fn get(&self, key: PresentationKey) -> Option<&PresentationNode> {
        self.arena.get(key.0)
    }

    pub fn data(&self, key: PresentationKey) -> Option<NodeKey> {
        self.get(key).map(|n| n.data)
    }

    pub fn parent(&self, key: PresentationKey) -> Option<PresentationKey> {
        self.get(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: PresentationKey) -> Option<&Children> {
        self.get(key).map(|n| &n.children)
    }

    pub fn visible_children(&self, key: PresentationKey) -> Option<&[PresentationKey]> {
        self.children(key).and_then(Children::visible)
    }

    pub fn hidden_children(&self, key: PresentationKey) -> Option<&[PresentationKey]> {
        self.children(key).and_then(Children::hidden)
    }

    pub fn is_collapsed(&self, key: PresentationKey) -> bool {
        self.children(key).is_some_and(Children::is_collapsed)
    }

    /// Presentation node currently showing document node `data`.
    pub fn key_for(&self, data: NodeKey) -> Option<PresentationKey> {
        self.by_data.get(&data).copied()
    }

    pub fn depth(&self, key: PresentationKey) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.get(key)?.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        Some(depth)
    }

    /// Pre-order iterator over the subtree at `from`, hidden nodes included.
    pub fn iter_from(&self, from: PresentationKey) -> HierarchyIter<'_> {
        HierarchyIter {
            hierarchy: self,
            stack: vec![from],
            visible_only: false,
        }
    }

    /// Every node below and including `from`, regardless of visibility.
    pub fn all_nodes(&self, from: PresentationKey) -> Vec<PresentationKey> {
        self.iter_from(from).map(|(k, _)| k).collect()
    }

    /// Nodes reachable from the root through expanded slots only.
    pub fn visible_nodes(&self) -> Vec<PresentationKey> {
        HierarchyIter {
            hierarchy: self,
            stack: vec![self.root],
            visible_only: true,
        }
        .map(|(k, _)| k)
        .collect()
    }

    /// First node in pre-order below `from` matching `predicate`.
    pub fn find(
        &self,
        from: PresentationKey,
        mut predicate: impl FnMut(PresentationKey, &PresentationNode) -> bool,
    ) -> Option<PresentationKey> {
        self.iter_from(from)
            .find(|&(k, n)| predicate(k, n))
            .map(|(k, _)| k)
    }

    /// True if `candidate` is `ancestor` or is reachable below it through
    /// visible or hidden children.
    pub fn is_self_or_descendant(
        &self,
        ancestor: PresentationKey,
        candidate: PresentationKey,
    ) -> bool {
        self.iter_from(ancestor).any(|(k, _)| k == candidate)
    }

    pub fn toggle(&mut self, key: PresentationKey) -> bool {
        self.arena
            .get_mut(key.0)
            .is_some_and(|n| n.children.toggle())
    }

    pub fn expand(&mut self, key: PresentationKey) -> bool {
        self.arena
            .get_mut(key.0)
            .is_some_and(|n| n.children.expand())
    }

    pub fn collapse(&mut self, key: PresentationKey) -> bool {
        self.arena
            .get_mut(key.0)
            .is_some_and(|n| n.children.collapse())
    }

    pub fn expand_all(&mut self) {
        for (_, node) in self.arena.iter_mut() {
            node.children.expand();
        }
    }

    /// Collapse every node at `depth` or deeper.
    pub fn collapse_from_depth(&mut self, depth: usize) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((key, level)) = stack.pop() {
            let Some(node) = self.arena.get_mut(key.0) else {
                continue;
            };
            if level >= depth {
                node.children.collapse();
            }
            stack.extend(node.children.keys().iter().map(|&c| (c, level + 1)));
        }
    }

    pub fn set_prior_position(&mut self, key: PresentationKey, position: Point) -> bool {
        self.arena
            .get_mut(key.0)
            .map(|n| n.prior_position = Some(position))
            .is_some()
    }

    pub fn set_cached_size(&mut self, key: PresentationKey, size: Size) -> bool {
        self.arena
            .get_mut(key.0)
            .map(|n| n.cached_size = Some(size))
            .is_some()
    }

    /// Tracking id of `key`, generated on first request.
    pub fn ensure_tracking_id(&mut self, key: PresentationKey) -> Option<TrackingId> {
        let next = TrackingId(self.last_tracking_id + 1);
        let node = self.arena.get_mut(key.0)?;
        match node.tracking_id {
            Some(id) => Some(id),
            None => {
                node.tracking_id = Some(next);
                self.last_tracking_id = next.0;
                Some(next)
            }
        }
    }

    pub(crate) fn restore_state(
        &mut self,
        key: PresentationKey,
        tracking_id: Option<TrackingId>,
        prior_position: Option<Point>,
        cached_size: Option<Size>,
    ) {
        if let Some(node) = self.arena.get_mut(key.0) {
            node.tracking_id = tracking_id;
            node.prior_position = prior_position;
            node.cached_size = cached_size;
        }
    }
}

fn populate(
    arena: &mut Arena<PresentationNode>,
    by_data: &mut HashMap<NodeKey, PresentationKey>,
    document: &DocumentTree,
) -> PresentationKey {
    let doc_root = document.root();
    let root = PresentationKey(arena.insert(PresentationNode::new(doc_root, None)));
    by_data.insert(doc_root, root);

    let mut stack = vec![(doc_root, root)];
    while let Some((doc_key, key)) = stack.pop() {
        let Some(doc_node) = document.get(doc_key) else {
            continue;
        };
        if doc_node.is_leaf() {
            continue;
        }
        let mut child_keys = Vec::with_capacity(doc_node.children().len());
        for &doc_child in doc_node.children() {
            let child = PresentationKey(arena.insert(PresentationNode::new(doc_child, Some(key))));
            by_data.insert(doc_child, child);
            child_keys.push(child);
            stack.push((doc_child, child));
        }
        if let Some(node) = arena.get_mut(key.0) {
            node.children = Children::Visible(child_keys);
        }
    }
    root
}

pub struct HierarchyIter<'a> {
    hierarchy: &'a PresentationHierarchy,
    stack: Vec<PresentationKey>,
    visible_only: bool,
}

impl<'a> Iterator for HierarchyIter<'a> {
    type Item = (PresentationKey, &'a PresentationNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.hierarchy.get(current) {
                let next = if self.visible_only {
                    node.children.visible().unwrap_or(&[])
                } else {
                    node.children.keys()
                };
                self.stack.extend(next.iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}
