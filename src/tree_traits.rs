//! Text rendering of the document tree and the presentation hierarchy.

use termtree::Tree;

use crate::domain::{Children, DocumentTree, NodeKey, PresentationHierarchy, PresentationKey};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for DocumentTree {
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &DocumentTree, key: NodeKey) -> Tree<String> {
            let Some(node) = tree.get(key) else {
                return Tree::new(String::new());
            };
            Tree::new(node.name.clone())
                .with_leaves(node.children().iter().map(|&child| build_tree(tree, child)))
        }

        build_tree(self, self.root())
    }
}

/// A presentation hierarchy paired with the document it shows.
///
/// Renders only expanded branches; a collapsed node is labelled with the
/// number of children it hides, e.g. `Topic [+3]`.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyView<'a> {
    pub hierarchy: &'a PresentationHierarchy,
    pub document: &'a DocumentTree,
}

impl<'a> HierarchyView<'a> {
    pub fn new(hierarchy: &'a PresentationHierarchy, document: &'a DocumentTree) -> Self {
        Self {
            hierarchy,
            document,
        }
    }

    fn label(&self, key: PresentationKey) -> String {
        let Some(node) = self.hierarchy.get(key) else {
            return String::new();
        };
        let name = self
            .document
            .get(node.data())
            .map(|n| n.name.as_str())
            .unwrap_or_default();
        match node.children() {
            Children::Hidden(hidden) => format!("{} [+{}]", name, hidden.len()),
            _ => name.to_string(),
        }
    }

    fn subtree(&self, key: PresentationKey) -> Tree<String> {
        let visible = self.hierarchy.visible_children(key).unwrap_or(&[]);
        Tree::new(self.label(key)).with_leaves(visible.iter().map(|&child| self.subtree(child)))
    }
}

impl TreeNodeConvert for HierarchyView<'_> {
    fn to_tree_string(&self) -> Tree<String> {
        self.subtree(self.hierarchy.root())
    }
}
