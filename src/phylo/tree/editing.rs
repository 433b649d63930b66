use super::{Tree, TreeError};
use crate::phylo::TreeFloat;
use crate::phylo::node::{Node, NodeId};
use rand::Rng;
use rand::seq::index;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, warn};

/// Length of an edge made by merging two consecutive edges. An absent
/// length only survives if both parts are absent.
fn merge_lengths(
    upper: Option<TreeFloat>,
    lower: Option<TreeFloat>,
) -> Option<TreeFloat> {
    match (upper, lower) {
        (Some(u), Some(l)) => Some(u + l),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// A copy of the tree in which one OTU has traded places with `partner`.
#[derive(Debug, Clone)]
pub struct SwapVariant {
    pub partner: Arc<str>,
    pub tree: Tree,
}

/// Lazily produces one [`SwapVariant`] per other OTU, in pre-order.
///
/// The source tree is shared, and a variant is only built when it is
/// requested. Cloning the iterator, or calling [`SwapVariants::restart`],
/// replays the sequence.
#[derive(Debug, Clone)]
pub struct SwapVariants {
    tree: Arc<Tree>,
    otu_id: NodeId,
    partner_ids: Vec<NodeId>,
    position: usize,
}

impl SwapVariants {
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for SwapVariants {
    type Item = SwapVariant;

    fn next(&mut self) -> Option<Self::Item> {
        let &partner_id = self.partner_ids.get(self.position)?;
        self.position += 1;
        let mut tree = Tree::clone(&self.tree);
        tree.swap_labels(self.otu_id, partner_id);
        Some(SwapVariant {
            partner: Arc::from(self.tree.describe(partner_id)),
            tree,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.partner_ids.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SwapVariants {}

impl Tree {
    // =========================================================================
    // Structural Helpers
    // =========================================================================

    /// Removes a node that has exactly one child, joining the edge above it
    /// with the edge below it. A unary root hands the root role, and its
    /// stored length, to its child.
    pub(crate) fn splice_out(&mut self, node_id: NodeId) {
        let node = &self.nodes[node_id];
        let [child_id] = node.child_ids()[..] else {
            return;
        };
        let upper_length = node.branch_length();
        let upper_support = node.support();

        match node.parent_id().copied() {
            Some(parent_id) => {
                let child = &mut self.nodes[child_id];
                child.set_branch_length(merge_lengths(
                    upper_length,
                    child.branch_length(),
                ));
                child.set_support(child.support().or(upper_support));
                child.set_parent_id(Some(parent_id));
                let index = self.nodes[parent_id].remove_child_id(&node_id);
                self.nodes[parent_id]
                    .insert_child_id(index.unwrap_or(usize::MAX), child_id);
            }
            None => {
                self.nodes[child_id].set_branch_length(upper_length);
                self.set_root(child_id);
            }
        }

        self.nodes[node_id].set_child_ids(Vec::new());
        self.nodes[node_id].set_parent_id(None);
        self.remove_bare_node(node_id);
    }

    /// Splices out every node left with a single child. Returns how many
    /// nodes were removed.
    pub fn suppress_unary_nodes(&mut self) -> usize {
        let unary: Vec<NodeId> = self
            .postorder_all()
            .into_iter()
            .filter(|&id| self.nodes[id].child_node_count() == 1)
            .collect();
        for &node_id in &unary {
            self.splice_out(node_id);
        }
        unary.len()
    }

    /// Removes an internal edge: the children of `node_id` take its place
    /// under its parent, each inheriting the removed edge's length.
    fn collapse_node(&mut self, node_id: NodeId) {
        let Some(parent_id) = self.nodes[node_id].parent_id().copied() else {
            return;
        };
        let upper_length = self.nodes[node_id].branch_length();
        let child_ids = self.nodes[node_id].child_ids().to_vec();
        let index = self.nodes[parent_id]
            .remove_child_id(&node_id)
            .unwrap_or(usize::MAX);

        for (offset, &child_id) in child_ids.iter().enumerate() {
            let child = &mut self.nodes[child_id];
            child.set_branch_length(merge_lengths(
                upper_length,
                child.branch_length(),
            ));
            child.set_parent_id(Some(parent_id));
            self.nodes[parent_id]
                .insert_child_id(index.saturating_add(offset), child_id);
        }

        self.nodes[node_id].set_child_ids(Vec::new());
        self.nodes[node_id].set_parent_id(None);
        self.remove_bare_node(node_id);
    }

    /// Deletes a leaf and any ancestors left without children.
    fn remove_leaf_and_empty_ancestors(&mut self, leaf_id: NodeId) {
        let mut current = Some(leaf_id);
        while let Some(id) = current {
            if !self.nodes[id].child_ids().is_empty() {
                break;
            }
            current = self.nodes[id].parent_id().copied();
            if Some(id) == self.root_id {
                self.root_id = None;
            }
            self.remove_bare_node(id);
        }
    }

    // =========================================================================
    // Subsets
    // =========================================================================

    /// The tree induced by the given nodes.
    ///
    /// A single internal node yields its clade unchanged. Otherwise the result
    /// keeps the named leaves (and every leaf below a named internal node),
    /// their ancestors, and joins edges through nodes left with one child.
    pub fn subset(&self, node_ids: &[NodeId]) -> Result<Tree, TreeError> {
        if node_ids.is_empty() {
            return Err(TreeError::EmptySelection);
        }
        for &id in node_ids {
            _ = self.require(id)?;
        }

        let distinct: FxHashSet<NodeId> = node_ids.iter().copied().collect();
        if distinct.len() == 1 && !self.nodes[node_ids[0]].is_tip() {
            return self.subtree(node_ids[0]);
        }

        let keep: FxHashSet<NodeId> = distinct
            .iter()
            .flat_map(|&id| self.tip_node_ids(id))
            .collect();

        let mut tree = self.clone();
        for tip_id in self.tip_node_ids_all() {
            if !keep.contains(&tip_id) {
                tree.remove_leaf_and_empty_ancestors(tip_id);
            }
        }
        _ = tree.suppress_unary_nodes();
        debug!("subset kept {} of {} leaves", keep.len(), self.tip_count());
        Ok(tree)
    }

    /// Like [`Tree::subset`], addressed by label. Labels that do not occur
    /// in the tree are skipped.
    pub fn subset_by_labels<S: AsRef<str>>(
        &self,
        labels: &[S],
    ) -> Result<Tree, TreeError> {
        if labels.is_empty() {
            return Err(TreeError::EmptySelection);
        }
        let mut node_ids = Vec::with_capacity(labels.len());
        for label in labels {
            match self.node_id_by_label(label.as_ref()) {
                Some(id) => node_ids.push(id),
                None => warn!("'{}' is not in the tree; skipped", label.as_ref()),
            }
        }
        if node_ids.is_empty() {
            return Err(TreeError::LabelNotFound(labels[0].as_ref().to_string()));
        }
        self.subset(&node_ids)
    }

    // =========================================================================
    // Deletions
    // =========================================================================

    /// Removes the named leaves, then every internal node left without
    /// children, then every node left with a single child.
    pub fn delete_otus<S: AsRef<str>>(
        &mut self,
        labels: &[S],
    ) -> Result<usize, TreeError> {
        if labels.is_empty() {
            return Err(TreeError::EmptySelection);
        }
        let node_ids = self.require_labels(labels)?;
        let mut doomed: FxHashSet<NodeId> = FxHashSet::default();
        for &id in &node_ids {
            if !self.nodes[id].is_tip() {
                return Err(TreeError::NotALeaf(self.describe(id)));
            }
            _ = doomed.insert(id);
        }
        if doomed.len() >= self.tip_count() {
            return Err(TreeError::InvalidArgument(
                "deleting every OTU would leave an empty tree".to_string(),
            ));
        }

        for &id in &node_ids {
            if self.node_exists(id) {
                self.remove_leaf_and_empty_ancestors(id);
            }
        }
        let suppressed = self.suppress_unary_nodes();
        debug!(
            "deleted {} OTUs, suppressed {suppressed} unary nodes",
            doomed.len()
        );
        Ok(doomed.len())
    }

    /// Collapses every internal edge whose support is present and strictly
    /// below `threshold`. Edges without support are left alone. Returns the
    /// number of edges collapsed.
    pub fn delete_low_support(
        &mut self,
        threshold: TreeFloat,
    ) -> Result<usize, TreeError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(TreeError::InvalidArgument(format!(
                "support threshold must be a non-negative number, got {threshold}"
            )));
        }

        let weak: Vec<NodeId> = self
            .preorder_all()
            .into_iter()
            .filter(|&id| {
                let node = &self.nodes[id];
                !node.is_tip()
                    && !node.is_root()
                    && node.support().is_some_and(|s| s < threshold)
            })
            .collect();

        for &node_id in &weak {
            self.collapse_node(node_id);
        }
        debug!("collapsed {} edges with support < {threshold}", weak.len());
        Ok(weak.len())
    }

    // =========================================================================
    // Resolution & Cleaning
    // =========================================================================

    /// Resolves every multifurcation into random binary splits.
    ///
    /// Children are joined two at a time, both picked at random from the
    /// remaining pool, under a new node that rejoins the pool. New edges get
    /// length 0 (or no length if the tree has none) and no support. Returns
    /// the number of nodes added.
    pub fn force_bifurcating<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let new_length = self.has_any_branch_lengths().then_some(0e0);
        let polytomies: Vec<NodeId> = self
            .preorder_all()
            .into_iter()
            .filter(|&id| self.nodes[id].child_node_count() > 2)
            .collect();

        let mut added: usize = 0;
        for node_id in polytomies {
            let mut pool: Vec<NodeId> = self.nodes[node_id].child_ids().to_vec();
            while pool.len() > 2 {
                let picked = index::sample(rng, pool.len(), 2);
                let (i, j) = (picked.index(0), picked.index(1));
                let (first, second) = (pool[i.min(j)], pool[i.max(j)]);
                _ = pool.remove(i.max(j));
                _ = pool.remove(i.min(j));

                let mut joint = Node::new();
                joint.set_branch_length(new_length);
                let joint_id = self.nodes.insert_with_key(|id| {
                    joint.set_node_id(id);
                    joint
                });
                self.nodes[joint_id].set_parent_id(Some(node_id));
                for child_id in [first, second] {
                    self.nodes[child_id].set_parent_id(Some(joint_id));
                    self.nodes[joint_id].add_child_id(child_id);
                }
                pool.push(joint_id);
                added += 1;
            }
            self.nodes[node_id].set_child_ids(pool);
        }
        debug!("added {added} nodes while resolving multifurcations");
        added
    }

    pub fn clean_lengths(&mut self) {
        for node in self.nodes.values_mut() {
            node.set_branch_length(None);
        }
    }

    pub fn clean_support(&mut self) {
        for node in self.nodes.values_mut() {
            node.set_support(None);
        }
    }

    /// Orders children by the number of leaves below them, smallest first
    /// (largest first when `reverse` is set).
    pub fn ladderize(&mut self, reverse: bool) {
        let sizes: FxHashMap<NodeId, usize> = self
            .postorder_all()
            .into_iter()
            .map(|id| (id, self.tip_node_ids(id).len()))
            .collect();
        let size_of = |id: &NodeId| sizes.get(id).copied().unwrap_or_default();
        for node_id in self.preorder_all() {
            let mut sorted_ids = self.nodes[node_id].child_ids().to_vec();
            if reverse {
                sorted_ids.par_sort_by_key(|id| Reverse(size_of(id)));
            } else {
                sorted_ids.par_sort_by_key(size_of);
            }
            self.nodes[node_id].set_child_ids(sorted_ids);
        }
    }

    // =========================================================================
    // Swaps
    // =========================================================================

    /// One variant tree per other OTU, in each of which `label` and that OTU
    /// have exchanged positions.
    pub fn swap_otu_variants(&self, label: &str) -> Result<SwapVariants, TreeError> {
        self.clone().into_swap_variants(label)
    }

    /// Like [`Tree::swap_otu_variants`], taking ownership of the tree.
    pub fn into_swap_variants(self, label: &str) -> Result<SwapVariants, TreeError> {
        let otu_id = self.require_label(label)?;
        if !self.nodes[otu_id].is_tip() {
            return Err(TreeError::NotALeaf(label.to_string()));
        }
        let partner_ids = self
            .tip_node_ids_all()
            .into_iter()
            .filter(|&id| id != otu_id)
            .collect();
        Ok(SwapVariants { tree: Arc::new(self), otu_id, partner_ids, position: 0 })
    }
}
