mod editing;
mod rooting;
mod traversal;

pub use editing::{SwapVariant, SwapVariants};
pub use traversal::{DistanceMatrix, PathLength, WalkStep};

use super::TreeFloat;
use super::node::{Node, NodeId, NodeType};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Default prefix used when generating labels for unlabelled internal nodes.
pub const INTERNAL_LABEL_PREFIX: &str = "N";

/// Trees with more tips than this use `rayon` for per-tip computations.
pub(crate) const PARALLEL_TIP_THRESHOLD: usize = 100;

/// A rooted phylogenetic tree stored in an index-addressed arena.
///
/// Parent links are plain [`NodeId`] relations; every node is owned by the
/// arena and listed as a child of at most one parent.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    root_id: Option<NodeId>,
    label_index: FxHashMap<Arc<str>, Vec<NodeId>>,
    generated_label_counter: usize,
    /// Node inserted on a pendant edge by the last reroot on a leaf.
    leaf_split_id: Option<NodeId>,
}

/// Category of a failure, independent of which layer reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Structure,
    NotFound,
    MissingData,
    InvalidArgument,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("Node with NodeId: {0} does not exist.")]
    NodeDoesNotExist(NodeId),
    #[error("Node with NodeId: {0} already has a parent.")]
    NodeAlreadyAttached(NodeId),
    #[error("Attaching node {child} under node {parent} would create a cycle.")]
    WouldCreateCycle { child: NodeId, parent: NodeId },
    #[error("Tree already has a root; a new node needs a parent.")]
    RootAlreadySet,
    #[error("Tree is empty.")]
    EmptyTree,
    #[error("Tree validation failed: {0}.")]
    InvalidTree(String),
    #[error("No node is labelled '{0}'.")]
    LabelNotFound(String),
    #[error("Branch length is missing on the edge above '{0}'.")]
    MissingBranchLength(String),
    #[error("Missing data: {0}.")]
    MissingData(String),
    #[error("Node '{0}' is not a leaf.")]
    NotALeaf(String),
    #[error("Requested {requested} leaves, but the tree has only {available}.")]
    SampleTooLarge { requested: usize, available: usize },
    #[error("The selection is empty.")]
    EmptySelection,
    #[error("Invalid argument: {0}.")]
    InvalidArgument(String),
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::NodeDoesNotExist(_)
            | TreeError::NodeAlreadyAttached(_)
            | TreeError::WouldCreateCycle { .. }
            | TreeError::RootAlreadySet
            | TreeError::EmptyTree
            | TreeError::InvalidTree(_) => ErrorKind::Structure,
            TreeError::LabelNotFound(_) => ErrorKind::NotFound,
            TreeError::MissingBranchLength(_) | TreeError::MissingData(_) => {
                ErrorKind::MissingData
            }
            TreeError::NotALeaf(_)
            | TreeError::SampleTooLarge { .. }
            | TreeError::EmptySelection
            | TreeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl Tree {
    // =========================================================================
    // Construction
    // =========================================================================

    pub fn new() -> Self { Self::default() }

    pub fn add_new_node<'a>(
        &mut self,
        node_label: Option<impl Into<&'a str>>,
        branch_length: Option<TreeFloat>,
        support: Option<TreeFloat>,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let mut node: Node = Node::default();
        node.set_node_label(node_label);
        node.set_branch_length(branch_length);
        node.set_support(support);
        self.add_node(node, parent_node_id)
    }

    /// Inserts `node` as the last child of `parent_node_id`, or as the root
    /// when no parent is given and the tree is still empty.
    pub fn add_node(
        &mut self,
        mut node: Node,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        match parent_node_id {
            Some(parent_id) if !self.nodes.contains_key(parent_id) => {
                return Err(TreeError::NodeDoesNotExist(parent_id));
            }
            None if self.root_id.is_some() => {
                return Err(TreeError::RootAlreadySet);
            }
            _ => {}
        }

        node.set_parent_id(parent_node_id);
        node.set_child_ids(Vec::new());
        let node_id = self.nodes.insert_with_key(|node_id| {
            node.set_node_id(node_id);
            node
        });
        self.index_label(node_id);

        match parent_node_id {
            Some(parent_id) => self.nodes[parent_id].add_child_id(node_id),
            None => self.root_id = Some(node_id),
        }

        Ok(node_id)
    }

    /// Makes a detached node the last child of `parent_id`.
    ///
    /// Fails if `child_id` already has a parent, is the root, or if
    /// `parent_id` lies inside the subtree of `child_id`.
    pub fn attach(
        &mut self,
        child_id: NodeId,
        parent_id: NodeId,
    ) -> Result<(), TreeError> {
        let child = self.require(child_id)?;
        _ = self.require(parent_id)?;
        if child.parent_id().is_some() || self.root_id == Some(child_id) {
            return Err(TreeError::NodeAlreadyAttached(child_id));
        }
        if self.is_ancestor_or_self(child_id, parent_id) {
            return Err(TreeError::WouldCreateCycle {
                child: child_id,
                parent: parent_id,
            });
        }
        self.nodes[child_id].set_parent_id(Some(parent_id));
        self.nodes[parent_id].add_child_id(child_id);
        Ok(())
    }

    /// Cuts the edge above `node_id`. The node and its descendants stay in
    /// the arena until re-attached or removed.
    pub fn detach(&mut self, node_id: NodeId) -> Result<(), TreeError> {
        let parent_id = self
            .require(node_id)?
            .parent_id()
            .copied()
            .ok_or_else(|| {
                TreeError::InvalidTree(format!(
                    "cannot detach the root node {node_id}"
                ))
            })?;
        _ = self.nodes[parent_id].remove_child_id(&node_id);
        self.nodes[node_id].set_parent_id(None);
        Ok(())
    }

    /// Removes `node_id` and all of its descendants from the tree.
    pub fn remove_subtree(&mut self, node_id: NodeId) -> Result<(), TreeError> {
        _ = self.require(node_id)?;
        if let Some(parent_id) = self.nodes[node_id].parent_id().copied() {
            _ = self.nodes[parent_id].remove_child_id(&node_id);
        }
        for id in self.preorder(node_id) {
            self.unindex_label(id);
            _ = self.nodes.remove(id);
        }
        if self.root_id == Some(node_id) {
            self.root_id = None;
        }
        Ok(())
    }

    /// Removes a single node whose children have already been moved away.
    pub(crate) fn remove_bare_node(&mut self, node_id: NodeId) {
        debug_assert!(self.nodes[node_id].child_ids().is_empty());
        if let Some(parent_id) = self.nodes[node_id].parent_id().copied() {
            _ = self.nodes[parent_id].remove_child_id(&node_id);
        }
        self.unindex_label(node_id);
        _ = self.nodes.remove(node_id);
    }

    pub(crate) fn set_root(&mut self, node_id: NodeId) {
        self.nodes[node_id].set_parent_id(None);
        self.root_id = Some(node_id);
    }

    fn is_ancestor_or_self(&self, ancestor_id: NodeId, node_id: NodeId) -> bool {
        let mut current = Some(node_id);
        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            current = self.nodes[id].parent_id().copied();
        }
        false
    }

    /// Copies the clade below `node_id` into a new tree rooted at that node.
    pub fn subtree(&self, node_id: NodeId) -> Result<Tree, TreeError> {
        _ = self.require(node_id)?;
        let mut tree = Tree::new();
        let mut mapping: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        for id in self.preorder(node_id) {
            let node = self.nodes[id].clone();
            let parent = if id == node_id {
                None
            } else {
                node.parent_id().and_then(|p| mapping.get(p)).copied()
            };
            let new_id = tree.add_node(node, parent)?;
            _ = mapping.insert(id, new_id);
        }
        tree.generated_label_counter = self.generated_label_counter;
        Ok(tree)
    }

    // =========================================================================
    // Labels
    // =========================================================================

    fn index_label(&mut self, node_id: NodeId) {
        if let Some(label) = self.nodes[node_id].node_label() {
            self.label_index.entry(label).or_default().push(node_id);
        }
    }

    fn unindex_label(&mut self, node_id: NodeId) {
        let Some(label) = self.nodes.get(node_id).and_then(Node::node_label)
        else {
            return;
        };
        if let Some(ids) = self.label_index.get_mut(&label) {
            ids.retain(|id| *id != node_id);
            if ids.is_empty() {
                _ = self.label_index.remove(&label);
            }
        }
    }

    pub fn set_label(
        &mut self,
        node_id: NodeId,
        label: Option<&str>,
    ) -> Result<(), TreeError> {
        _ = self.require(node_id)?;
        self.unindex_label(node_id);
        self.nodes[node_id].set_node_label(label);
        self.index_label(node_id);
        Ok(())
    }

    /// Exchanges the labels (and metadata) of two nodes.
    pub(crate) fn swap_labels(&mut self, a: NodeId, b: NodeId) {
        self.unindex_label(a);
        self.unindex_label(b);
        let label_a = self.nodes[a].take_node_label();
        let label_b = self.nodes[b].replace_node_label(label_a);
        _ = self.nodes[a].replace_node_label(label_b);
        let metadata_a = self.nodes[a].metadata().clone();
        let metadata_b = self.nodes[b].metadata().clone();
        self.nodes[a].set_metadata(metadata_b);
        self.nodes[b].set_metadata(metadata_a);
        self.index_label(a);
        self.index_label(b);
    }

    /// Gives every unlabelled internal node a label made of `prefix` and a
    /// counter. The counter never repeats within a tree and skips values that
    /// would collide with an existing label. Returns the number of labels
    /// assigned.
    pub fn label_internal_nodes(&mut self, prefix: &str) -> usize {
        let mut assigned: usize = 0;
        for node_id in self.preorder_all() {
            let node = &self.nodes[node_id];
            if node.is_tip() || node.node_label().is_some() {
                continue;
            }
            let label = loop {
                self.generated_label_counter += 1;
                let candidate =
                    format!("{prefix}{}", self.generated_label_counter);
                if !self.label_index.contains_key(candidate.as_str()) {
                    break candidate;
                }
            };
            self.nodes[node_id].set_node_label(Some(label.as_str()));
            self.index_label(node_id);
            assigned += 1;
        }
        assigned
    }

    pub fn node_id_by_label<'a>(
        &self,
        label: impl Into<&'a str>,
    ) -> Option<NodeId> {
        let label: &str = label.into();
        self.label_index.get(label).and_then(|ids| ids.first()).copied()
    }

    pub fn require_label(&self, label: &str) -> Result<NodeId, TreeError> {
        self.node_id_by_label(label)
            .ok_or_else(|| TreeError::LabelNotFound(label.to_string()))
    }

    pub fn require_labels<S: AsRef<str>>(
        &self,
        labels: &[S],
    ) -> Result<Vec<NodeId>, TreeError> {
        labels.iter().map(|l| self.require_label(l.as_ref())).collect()
    }

    pub fn label(&self, node_id: NodeId) -> Option<Arc<str>> {
        self.nodes.get(node_id).and_then(Node::node_label)
    }

    /// Label of the node, or its id when it has none; used in messages.
    pub fn describe(&self, node_id: NodeId) -> String {
        match self.label(node_id) {
            Some(label) => label.to_string(),
            None => format!("#{node_id}"),
        }
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    pub fn require(&self, node_id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(node_id)
            .ok_or(TreeError::NodeDoesNotExist(node_id))
    }

    pub fn node_exists(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn root_id(&self) -> Option<NodeId> { self.root_id }

    pub fn require_root(&self) -> Result<NodeId, TreeError> {
        self.root_id.ok_or(TreeError::EmptyTree)
    }

    pub fn parent_id(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id)?.parent_id().copied()
    }

    pub fn child_ids(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes.get(node_id).map(Node::child_ids).unwrap_or_default()
    }

    pub fn is_tip(&self, node_id: NodeId) -> bool {
        self.nodes.get(node_id).is_some_and(Node::is_tip)
    }

    pub fn branch_length(&self, node_id: NodeId) -> Option<TreeFloat> {
        self.nodes.get(node_id)?.branch_length()
    }

    pub fn support(&self, node_id: NodeId) -> Option<TreeFloat> {
        self.nodes.get(node_id)?.support()
    }

    // =========================================================================
    // Tree Properties
    // =========================================================================

    pub fn is_empty(&self) -> bool { self.root_id.is_none() }

    pub fn node_count(&self) -> usize { self.preorder_all().len() }

    pub fn tip_count(&self) -> usize { self.tip_node_ids_all().len() }

    pub fn internal_node_count(&self) -> usize {
        self.node_count() - self.tip_count()
    }

    /// Ids of every node that has an edge above it, in pre-order.
    pub fn edge_node_ids(&self) -> Vec<NodeId> {
        self.preorder_all()
            .into_iter()
            .filter(|&id| Some(id) != self.root_id)
            .collect()
    }

    /// Sum of all branch lengths below the root; absent lengths count as 0.
    pub fn total_length(&self) -> TreeFloat {
        self.edge_node_ids()
            .iter()
            .filter_map(|&id| self.nodes[id].branch_length())
            .sum()
    }

    /// True when the tree has at least one edge and every edge has a length.
    pub fn has_branch_lengths(&self) -> bool {
        let edges = self.edge_node_ids();
        !edges.is_empty()
            && edges.iter().all(|&id| self.nodes[id].branch_length().is_some())
    }

    pub fn has_any_branch_lengths(&self) -> bool {
        self.edge_node_ids()
            .iter()
            .any(|&id| self.nodes[id].branch_length().is_some())
    }

    pub fn has_support_values(&self) -> bool {
        self.preorder_all()
            .iter()
            .any(|&id| self.nodes[id].support().is_some())
    }

    /// Every internal node has exactly two children.
    pub fn is_binary(&self) -> bool {
        self.preorder_all().iter().all(|&id| {
            let count = self.nodes[id].child_node_count();
            count == 0 || count == 2
        })
    }

    /// Fails with the first edge (pre-order) that has no length.
    pub fn require_branch_lengths(&self) -> Result<(), TreeError> {
        match self
            .edge_node_ids()
            .into_iter()
            .find(|&id| self.nodes[id].branch_length().is_none())
        {
            Some(id) => Err(TreeError::MissingBranchLength(self.describe(id))),
            None => Ok(()),
        }
    }

    pub fn tip_heights(&self) -> Vec<(NodeId, PathLength)> {
        let tip_ids = self.tip_node_ids_all();
        if tip_ids.len() > PARALLEL_TIP_THRESHOLD {
            tip_ids
                .par_iter()
                .map(|&node_id| (node_id, self.depth(node_id)))
                .collect()
        } else {
            tip_ids
                .iter()
                .map(|&node_id| (node_id, self.depth(node_id)))
                .collect()
        }
    }

    /// Largest root-to-tip depth; absent lengths count as 0.
    pub fn height(&self) -> TreeFloat {
        self.tip_heights()
            .iter()
            .map(|(_, depth)| depth.value)
            .fold(0.0, TreeFloat::max)
    }

    // =========================================================================
    // Display
    // =========================================================================

    fn print_tree(&self) -> String {
        let mut result: String = String::new();
        result.push_str(&format!(
            "Internal Nodes: {}\nTips: {}\nAll Nodes: {}\nHeight: {:7.5}\nBranch lengths: {}\n\n",
            self.internal_node_count(),
            self.tip_count(),
            self.node_count(),
            self.height(),
            self.has_branch_lengths()
        ));

        if let Some(root_id) = self.root_id {
            result.push_str(&self.print_node(root_id, 0));
        }

        result
    }

    fn print_node(&self, node_id: NodeId, level: usize) -> String {
        let node = &self.nodes[node_id];
        let mut result: String = format!(
            "{}- {} | {} | {:<5.3} | {} | {} | {}\n",
            " ".repeat(level * 4),
            node_id,
            match node.node_label() {
                Some(label) => label.to_string(),
                None => "None".to_string(),
            },
            node.branch_length().unwrap_or(TreeFloat::NAN),
            match node.support() {
                Some(support) => support.to_string(),
                None => "-".to_string(),
            },
            node.node_type(),
            node.metadata(),
        );

        for &child_node_id in node.child_ids() {
            result.push_str(&self.print_node(child_node_id, level + 1));
        }

        result
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print_tree())
    }
}
