//! Document tree: the canonical, serializable mind-map content.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use generational_arena::{Arena, Index};
use serde::Deserialize;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::DocumentRecord;

/// Stable handle of a document node.
///
/// Assigned when the node is created and kept across edits and moves,
/// so it is the identity the presentation layer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(Index);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{slot}.{generation}")
    }
}

/// A single mind-map node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    /// Display name of the node
    pub name: String,
    /// Opaque rich-text payload
    pub body: String,
    /// Persisted identifier, None until the node has been saved
    pub id: Option<String>,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl DocumentNode {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            id: None,
            parent: None,
            children: Vec::new(),
        }
    }

    fn from_record(record: &DocumentRecord) -> Self {
        Self {
            name: record.name.clone(),
            body: record.body.clone(),
            id: record.id.clone(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child keys in display order.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based document tree.
///
/// The root always exists and can never be removed or moved. Child order
/// is display order. All queries return materialized vectors in
/// document order.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    arena: Arena<DocumentNode>,
    root: NodeKey,
}

impl DocumentTree {
    /// Create a tree consisting of a single root node.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = NodeKey(arena.insert(DocumentNode::new(name, body)));
        Self { arena, root }
    }

    /// Build a tree from its nested record form.
    #[instrument(level = "trace", skip(record), fields(root = %record.name))]
    pub fn from_record(record: &DocumentRecord) -> Self {
        let mut arena = Arena::new();
        let root = NodeKey(arena.insert(DocumentNode::from_record(record)));
        let mut tree = Self { arena, root };

        // Reverse push keeps siblings in document order when popped
        let mut stack: Vec<(&DocumentRecord, NodeKey)> =
            record.children.iter().rev().map(|c| (c, root)).collect();
        while let Some((current, parent)) = stack.pop() {
            let key = tree.insert_under(parent, DocumentNode::from_record(current));
            for child in current.children.iter().rev() {
                stack.push((child, key));
            }
        }
        tree
    }

    /// Parse a JSON document.
    ///
    /// Fails with [`DomainError::MalformedDocument`] when a node has no
    /// string `name`, or when `children` is present but not a sequence.
    ///
    /// Nesting depth is unbounded; the stack grows on demand while
    /// deeply nested children are decoded.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let record = DocumentRecord::deserialize(serde_stacker::Deserializer::new(
            &mut deserializer,
        ))
        .and_then(|record| deserializer.end().map(|()| record))
        .map_err(|e| DomainError::malformed(e.to_string()))?;
        Ok(Self::from_record(&record))
    }

    /// Parse an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> DomainResult<Self> {
        let record: DocumentRecord =
            serde_json::from_value(value).map_err(|e| DomainError::malformed(e.to_string()))?;
        Ok(Self::from_record(&record))
    }

    pub fn to_record(&self) -> DocumentRecord {
        self.record_of(self.root, self.root_node())
    }

    pub fn to_value(&self) -> DomainResult<serde_json::Value> {
        serde_json::to_value(self.to_record()).map_err(DomainError::Encode)
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string(&self.to_record()).map_err(DomainError::Encode)
    }

    pub fn to_json_pretty(&self) -> DomainResult<String> {
        serde_json::to_string_pretty(&self.to_record()).map_err(DomainError::Encode)
    }

    /// Record of the subtree rooted at `key`.
    pub fn subtree_record(&self, key: NodeKey) -> Option<DocumentRecord> {
        self.get(key).map(|node| self.record_of(key, node))
    }

    /// Children are assembled bottom-up in post-order, so nesting depth
    /// never reaches the call stack.
    fn record_of(&self, key: NodeKey, node: &DocumentNode) -> DocumentRecord {
        let mut finished: HashMap<NodeKey, DocumentRecord> = HashMap::new();
        for (current, descendant) in self.iter_postorder_from(key) {
            if current == key {
                break;
            }
            let record = assemble(descendant, &mut finished);
            finished.insert(current, record);
        }
        assemble(node, &mut finished)
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    fn root_node(&self) -> &DocumentNode {
        // root is inserted on construction and never removed
        &self.arena[self.root.0]
    }

    pub fn get(&self, key: NodeKey) -> Option<&DocumentNode> {
        self.arena.get(key.0)
    }

    /// Mutable access for in-place edits of name, body and id.
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut DocumentNode> {
        self.arena.get_mut(key.0)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.arena.contains(key.0)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    fn insert_under(&mut self, parent: NodeKey, mut node: DocumentNode) -> NodeKey {
        node.parent = Some(parent);
        node.children.clear();
        let key = NodeKey(self.arena.insert(node));
        if let Some(parent_node) = self.arena.get_mut(parent.0) {
            parent_node.children.push(key);
        }
        key
    }

    /// Append `node` as the last child of `parent`.
    #[instrument(level = "debug", skip(self, node), fields(name = %node.name))]
    pub fn append_child(&mut self, parent: NodeKey, node: DocumentNode) -> DomainResult<NodeKey> {
        if !self.contains(parent) {
            return Err(DomainError::UnknownNode(parent));
        }
        Ok(self.insert_under(parent, node))
    }

    /// Remove `key` and its whole subtree, returning what was removed.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, key: NodeKey) -> DomainResult<DocumentRecord> {
        if key == self.root {
            return Err(DomainError::RootNode);
        }
        let record = self
            .subtree_record(key)
            .ok_or(DomainError::UnknownNode(key))?;

        self.detach(key);
        let doomed: Vec<NodeKey> = self.iter_from(key).map(|(k, _)| k).collect();
        for k in doomed {
            self.arena.remove(k.0);
        }
        Ok(record)
    }

    /// Re-parent the subtree at `key` as the last child of `new_parent`.
    ///
    /// Refuses the root and any target inside the moved subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn move_subtree(&mut self, key: NodeKey, new_parent: NodeKey) -> DomainResult<()> {
        if !self.contains(key) {
            return Err(DomainError::UnknownNode(key));
        }
        if !self.contains(new_parent) {
            return Err(DomainError::UnknownNode(new_parent));
        }
        if key == self.root {
            return Err(DomainError::RootNode);
        }
        if self.is_self_or_descendant(key, new_parent) {
            return Err(DomainError::CycleDetected {
                node: key,
                target: new_parent,
            });
        }

        self.detach(key);
        if let Some(node) = self.arena.get_mut(key.0) {
            node.parent = Some(new_parent);
        }
        if let Some(parent) = self.arena.get_mut(new_parent.0) {
            parent.children.push(key);
        }
        Ok(())
    }

    fn detach(&mut self, key: NodeKey) {
        let parent = self.get(key).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.arena.get_mut(p.0)) {
            parent.children.retain(|&c| c != key);
        }
        if let Some(node) = self.arena.get_mut(key.0) {
            node.parent = None;
        }
    }

    /// True if `candidate` is `ancestor` itself or lies below it.
    pub fn is_self_or_descendant(&self, ancestor: NodeKey, candidate: NodeKey) -> bool {
        let mut current = Some(candidate);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.get(key).and_then(|n| n.parent);
        }
        false
    }

    pub fn rename(&mut self, key: NodeKey, name: impl Into<String>) -> DomainResult<()> {
        let node = self.get_mut(key).ok_or(DomainError::UnknownNode(key))?;
        node.name = name.into();
        Ok(())
    }

    pub fn set_body(&mut self, key: NodeKey, body: impl Into<String>) -> DomainResult<()> {
        let node = self.get_mut(key).ok_or(DomainError::UnknownNode(key))?;
        node.body = body.into();
        Ok(())
    }

    /// Fill `id` for every unsaved node, returning how many were assigned.
    #[instrument(level = "debug", skip(self, generate))]
    pub fn assign_missing_ids(&mut self, mut generate: impl FnMut() -> String) -> usize {
        let mut assigned = 0;
        for (_, node) in self.arena.iter_mut() {
            if node.id.is_none() {
                node.id = Some(generate());
                assigned += 1;
            }
        }
        assigned
    }

    /// Depth-first pre-order iterator from the root.
    pub fn iter(&self) -> PreOrderIter<'_> {
        self.iter_from(self.root)
    }

    /// Depth-first pre-order iterator over the subtree at `key`.
    pub fn iter_from(&self, key: NodeKey) -> PreOrderIter<'_> {
        PreOrderIter {
            tree: self,
            stack: vec![key],
        }
    }

    pub fn iter_postorder(&self) -> PostOrderIter<'_> {
        self.iter_postorder_from(self.root)
    }

    /// Post-order iterator over the subtree at `key`; `key` comes last.
    pub fn iter_postorder_from(&self, key: NodeKey) -> PostOrderIter<'_> {
        PostOrderIter {
            tree: self,
            stack: vec![(key, false)],
        }
    }

    pub fn preorder(&self) -> Vec<NodeKey> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn breadth_first(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.node_count());
        let mut queue = VecDeque::from([self.root]);
        while let Some(key) = queue.pop_front() {
            if let Some(node) = self.get(key) {
                order.push(key);
                queue.extend(node.children.iter().copied());
            }
        }
        order
    }

    pub fn find_first_by_name(&self, name: &str) -> Option<NodeKey> {
        self.iter().find(|(_, n)| n.name == name).map(|(k, _)| k)
    }

    pub fn find_all_by_name(&self, name: &str) -> Vec<NodeKey> {
        self.iter()
            .filter(|(_, n)| n.name == name)
            .map(|(k, _)| k)
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeKey> {
        self.iter()
            .find(|(_, n)| n.id.as_deref() == Some(id))
            .map(|(k, _)| k)
    }

    pub fn leaf_nodes(&self) -> Vec<NodeKey> {
        self.iter()
            .filter(|(_, n)| n.is_leaf())
            .map(|(k, _)| k)
            .collect()
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth_of(&self, key: NodeKey) -> Option<usize> {
        Some(self.path_to(key)?.len() - 1)
    }

    /// Keys from the root down to `key`, both inclusive.
    pub fn path_to(&self, key: NodeKey) -> Option<Vec<NodeKey>> {
        let mut path = vec![key];
        let mut current = self.get(key)?.parent;
        while let Some(parent) = current {
            path.push(parent);
            current = self.get(parent).and_then(|n| n.parent);
        }
        path.reverse();
        Some(path)
    }

    pub fn nodes_at_depth(&self, depth: usize) -> Vec<NodeKey> {
        let mut level = vec![self.root];
        for _ in 0..depth {
            level = level
                .iter()
                .filter_map(|&k| self.get(k))
                .flat_map(|n| n.children.iter().copied())
                .collect();
        }
        level
    }

    /// Longest root-to-leaf distance; a root-only tree has depth 0.
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0)];
        while let Some((key, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some(node) = self.get(key) {
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        deepest
    }
}

/// Record for `node` whose children have already been built.
fn assemble(node: &DocumentNode, finished: &mut HashMap<NodeKey, DocumentRecord>) -> DocumentRecord {
    DocumentRecord {
        name: node.name.clone(),
        body: node.body.clone(),
        id: node.id.clone(),
        children: node
            .children
            .iter()
            .filter_map(|child| finished.remove(child))
            .collect(),
    }
}

/// Structural equality: keys are ignored, only content and order matter.
impl PartialEq for DocumentTree {
    fn eq(&self, other: &Self) -> bool {
        self.to_record() == other.to_record()
    }
}

impl Eq for DocumentTree {}

pub struct PreOrderIter<'a> {
    tree: &'a DocumentTree,
    stack: Vec<NodeKey>,
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (NodeKey, &'a DocumentNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIter<'a> {
    tree: &'a DocumentTree,
    stack: Vec<(NodeKey, bool)>,
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = (NodeKey, &'a DocumentNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //      root
    //      /  \
    //     a    b
    //     |
    //     c
    fn sample() -> (DocumentTree, NodeKey, NodeKey, NodeKey) {
        let mut tree = DocumentTree::new("root", "");
        let root = tree.root();
        let a = tree.append_child(root, DocumentNode::new("a", "")).unwrap();
        let b = tree.append_child(root, DocumentNode::new("b", "")).unwrap();
        let c = tree.append_child(a, DocumentNode::new("c", "")).unwrap();
        (tree, a, b, c)
    }

    #[test]
    fn given_tree_when_iterating_postorder_then_children_precede_parents() {
        let (tree, a, b, c) = sample();

        let order: Vec<NodeKey> = tree.iter_postorder().map(|(k, _)| k).collect();

        assert_eq!(order, vec![c, a, b, tree.root()]);
    }

    #[test]
    fn given_removed_subtree_when_looking_up_descendants_then_they_are_gone() {
        let (mut tree, a, _, c) = sample();

        let removed = tree.remove_subtree(a).unwrap();

        assert_eq!(removed.name, "a");
        assert_eq!(removed.children.len(), 1);
        assert!(!tree.contains(a));
        assert!(!tree.contains(c));
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn given_node_key_when_displayed_then_shows_slot_and_generation() {
        let (tree, ..) = sample();

        assert_eq!(tree.root().to_string(), "#0.0");
    }
}
