use super::TreeFloat;
use super::attribute::Metadata;
use slotmap::new_key_type;
use std::{fmt::Display, sync::Arc};

new_key_type! { pub struct NodeId; }

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub enum NodeType {
    Tip,
    Internal,
    Root,
}

/// A single vertex of a [`Tree`](super::Tree).
///
/// The branch length and support value describe the edge leading from the
/// parent to this node; the root has no such edge, but a root length read
/// from the input is kept so that it can be written back out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    node_id: Option<NodeId>,
    parent_id: Option<NodeId>,
    child_ids: Vec<NodeId>,
    branch_length: Option<TreeFloat>,
    support: Option<TreeFloat>,
    node_label: Option<Arc<str>>,
    metadata: Metadata,
}

impl Node {
    pub fn new() -> Self { Self::default() }

    pub fn is_tip(&self) -> bool { self.child_ids.is_empty() }

    pub fn is_root(&self) -> bool { self.parent_id.is_none() }

    pub fn child_ids(&self) -> &[NodeId] { &self.child_ids }

    pub(crate) fn set_child_ids(&mut self, child_ids: Vec<NodeId>) {
        self.child_ids = child_ids
    }

    pub fn child_node_count(&self) -> usize { self.child_ids.len() }

    pub(crate) fn add_child_id(&mut self, node_id: NodeId) {
        self.child_ids.push(node_id)
    }

    pub(crate) fn insert_child_id(&mut self, index: usize, node_id: NodeId) {
        let index = index.min(self.child_ids.len());
        self.child_ids.insert(index, node_id)
    }

    /// Removes `node_id` from the children, keeping the order of the rest.
    /// Returns the position it occupied.
    pub(crate) fn remove_child_id(&mut self, node_id: &NodeId) -> Option<usize> {
        let idx = self.child_ids.iter().position(|id| id == node_id)?;
        _ = self.child_ids.remove(idx);
        Some(idx)
    }

    pub fn node_id(&self) -> Option<&NodeId> { self.node_id.as_ref() }

    pub(crate) fn set_node_id(&mut self, node_id: NodeId) {
        self.node_id = Some(node_id);
    }

    pub fn parent_id(&self) -> Option<&NodeId> { self.parent_id.as_ref() }

    pub(crate) fn set_parent_id(&mut self, node_id: Option<NodeId>) {
        self.parent_id = node_id;
    }

    pub fn branch_length(&self) -> Option<TreeFloat> { self.branch_length }

    pub fn set_branch_length(&mut self, branch_length: Option<TreeFloat>) {
        self.branch_length = branch_length;
    }

    pub fn support(&self) -> Option<TreeFloat> { self.support }

    pub fn set_support(&mut self, support: Option<TreeFloat>) {
        self.support = support;
    }

    pub fn node_label(&self) -> Option<Arc<str>> { self.node_label.clone() }

    /// Label changes on nodes already in a tree must go through
    /// [`Tree::set_label`](super::Tree::set_label) so the label index stays
    /// current.
    pub(crate) fn set_node_label<'a>(
        &mut self,
        node_label: Option<impl Into<&'a str>>,
    ) {
        self.node_label = node_label.map(|label| label.into().into());
    }

    pub(crate) fn take_node_label(&mut self) -> Option<Arc<str>> {
        self.node_label.take()
    }

    pub(crate) fn replace_node_label(
        &mut self,
        node_label: Option<Arc<str>>,
    ) -> Option<Arc<str>> {
        std::mem::replace(&mut self.node_label, node_label)
    }

    pub fn metadata(&self) -> &Metadata { &self.metadata }

    pub fn metadata_mut(&mut self) -> &mut Metadata { &mut self.metadata }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    pub fn node_type(&self) -> NodeType {
        match (self.parent_id.is_some(), self.child_ids.is_empty()) {
            (false, _) => NodeType::Root,
            (true, true) => NodeType::Tip,
            (true, false) => NodeType::Internal,
        }
    }
}

impl<'a> From<&'a str> for Node {
    fn from(value: &'a str) -> Self {
        let mut node = Node::default();
        let label = match value {
            "" => None,
            v => Some(v),
        };
        node.set_node_label(label);
        node
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disp = format!("{self:?}");
        write!(f, "{}", &disp[7..disp.len() - 1])
    }
}

impl From<NodeId> for String {
    fn from(node_id: NodeId) -> Self { format!("{node_id}") }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeType::Tip => "Tip",
                NodeType::Internal => "Internal",
                NodeType::Root => "Root",
            }
        )
    }
}
