use super::{Tree, TreeError};
use crate::phylo::TreeFloat;
use crate::phylo::node::{Node, NodeId};
use tracing::debug;

/// Lengths closer than this are treated as equal when locating a midpoint.
const EPSILON: TreeFloat = 1e-9;

impl Tree {
    // =========================================================================
    // Rooting Operations
    // =========================================================================

    /// Makes `target` the root by reversing every edge on the path from the
    /// old root to `target`.
    ///
    /// Branch lengths and support values travel with their edges: the edge
    /// that was above a node on the path ends up below it. The length and
    /// support stored on the old root move to the new root, so the total
    /// length is unchanged. A leaf target is first split at the middle of
    /// its pendant edge and the tree is rooted on the new node. The old root
    /// is kept even if it is left with a single child, unless it is the
    /// node a previous leaf reroot inserted: that one is spliced out again,
    /// so rerooting back restores the original tree.
    pub fn reroot(&mut self, target: NodeId) -> Result<NodeId, TreeError> {
        _ = self.require(target)?;
        let old_root = self.require_root()?;
        if target == old_root {
            return Ok(old_root);
        }

        let previous_split = self.leaf_split_id.take();
        let target = if self.nodes[target].is_tip() {
            let half = self.nodes[target].branch_length().unwrap_or(0.0) / 2e0;
            let split_id = self.split_edge(target, half)?;
            self.leaf_split_id = Some(split_id);
            split_id
        } else {
            target
        };

        let path = self.path_to_root(target);
        let edges: Vec<(Option<TreeFloat>, Option<TreeFloat>)> = path
            .iter()
            .map(|&id| (self.nodes[id].branch_length(), self.nodes[id].support()))
            .collect();

        for (i, pair) in path.windows(2).enumerate() {
            let (child_id, parent_id) = (pair[0], pair[1]);
            _ = self.nodes[parent_id].remove_child_id(&child_id);
            self.nodes[child_id].add_child_id(parent_id);
            self.nodes[parent_id].set_parent_id(Some(child_id));
            self.nodes[parent_id].set_branch_length(edges[i].0);
            self.nodes[parent_id].set_support(edges[i].1);
        }

        let (root_length, root_support) = edges.last().copied().unwrap_or_default();
        self.nodes[target].set_branch_length(root_length);
        self.nodes[target].set_support(root_support);
        self.set_root(target);

        if let Some(split_id) = previous_split
            && split_id == old_root
            && self.node_exists(split_id)
            && self.nodes[split_id].child_node_count() == 1
        {
            self.splice_out(split_id);
            debug!("removed the node inserted by the previous leaf reroot");
        }

        debug!(
            "rerooted on {} ({} edges reversed)",
            self.describe(target),
            path.len() - 1
        );
        Ok(target)
    }

    pub fn reroot_by_label(&mut self, label: &str) -> Result<NodeId, TreeError> {
        let target = self.require_label(label)?;
        self.reroot(target)
    }

    /// Roots the tree halfway along its longest leaf-to-leaf path.
    ///
    /// The two leaves are the first pair, in pre-order, whose distance is
    /// maximal. If the halfway point falls inside an edge, the edge is split
    /// by a new node. An old root left with one child is suppressed.
    pub fn midpoint_reroot(&mut self) -> Result<NodeId, TreeError> {
        let old_root = self.require_root()?;
        self.require_branch_lengths()?;

        let matrix = self.distance_matrix();
        let mut farthest: Option<(usize, usize, TreeFloat)> = None;
        for i in 0..matrix.len() {
            for j in i + 1..matrix.len() {
                let d = matrix.get(i, j).unwrap_or_default();
                if farthest.is_none_or(|(_, _, best)| d > best) {
                    farthest = Some((i, j, d));
                }
            }
        }

        let Some((i, j, diameter)) = farthest else {
            return Ok(old_root);
        };
        if diameter <= EPSILON {
            return Ok(old_root);
        }

        let (a, b) = (matrix.node_ids()[i], matrix.node_ids()[j]);
        let half = diameter / 2e0;
        let lca = self.lca_pair(a, b);
        let side_a = self.depth(a).value - self.depth(lca).value;
        let start = if side_a >= half { a } else { b };

        let mut remaining = half;
        let mut current = start;
        let new_root = loop {
            if remaining <= EPSILON {
                break current;
            }
            let length = self.nodes[current].branch_length().unwrap_or(0.0);
            let Some(&parent_id) = self.nodes[current].parent_id() else {
                break current;
            };
            if (remaining - length).abs() <= EPSILON {
                break parent_id;
            }
            if remaining < length {
                break self.split_edge(current, remaining)?;
            }
            remaining -= length;
            current = parent_id;
        };

        debug!(
            "midpoint between {} and {} (diameter {diameter})",
            self.describe(a),
            self.describe(b)
        );

        let new_root = self.reroot(new_root)?;
        if old_root != new_root
            && self.node_exists(old_root)
            && self.nodes[old_root].child_node_count() == 1
        {
            self.splice_out(old_root);
        }
        Ok(new_root)
    }

    /// Inserts a new node on the edge above `child_id`, `below` length units
    /// above the child. The new node takes the child's place among its
    /// siblings and copies the edge's support.
    pub(crate) fn split_edge(
        &mut self,
        child_id: NodeId,
        below: TreeFloat,
    ) -> Result<NodeId, TreeError> {
        let parent_id =
            self.nodes[child_id].parent_id().copied().ok_or_else(|| {
                TreeError::InvalidTree(format!(
                    "the root node {child_id} has no edge to split"
                ))
            })?;

        let length = self.nodes[child_id].branch_length();
        let mut node = Node::new();
        node.set_branch_length(length.map(|l| (l - below).max(0.0)));
        node.set_support(self.nodes[child_id].support());

        let index = self.nodes[parent_id].remove_child_id(&child_id);
        let mid_id = self.add_node(node, Some(parent_id))?;
        if let Some(index) = index {
            _ = self.nodes[parent_id].remove_child_id(&mid_id);
            self.nodes[parent_id].insert_child_id(index, mid_id);
        }

        self.nodes[child_id].set_parent_id(Some(mid_id));
        self.nodes[child_id].set_branch_length(length.map(|_| below));
        self.nodes[mid_id].add_child_id(child_id);
        Ok(mid_id)
    }
}
