use super::{PARALLEL_TIP_THRESHOLD, Tree, TreeError};
use crate::phylo::TreeFloat;
use crate::phylo::node::NodeId;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SecondaryMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// A summed branch length together with a flag telling whether any edge on
/// the path had no length (and was counted as 0).
///
/// When `missing_lengths` is set the value is unitless: it is computed, but
/// it is not a real distance.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PathLength {
    pub value: TreeFloat,
    pub missing_lengths: bool,
}

impl PathLength {
    pub fn is_exact(&self) -> bool { !self.missing_lengths }

    fn extend(self, branch_length: Option<TreeFloat>) -> Self {
        match branch_length {
            Some(length) => Self { value: self.value + length, ..self },
            None => Self { missing_lengths: true, ..self },
        }
    }
}

/// One leaf reached by [`Tree::walk`].
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    pub node_id: NodeId,
    pub label: Arc<str>,
    /// Path length from the start leaf to this leaf.
    pub distance: PathLength,
    /// Sum of every distinct edge crossed so far; backtracking adds nothing.
    pub traveled: PathLength,
}

/// Pairwise leaf distances stored as a lower triangle without the diagonal.
///
/// Leaves are ordered as [`Tree::tip_node_ids_all`] returns them.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    node_ids: Vec<NodeId>,
    labels: Vec<Arc<str>>,
    values: Vec<TreeFloat>,
    missing_lengths: bool,
}

impl DistanceMatrix {
    pub fn len(&self) -> usize { self.node_ids.len() }

    pub fn is_empty(&self) -> bool { self.node_ids.is_empty() }

    pub fn labels(&self) -> &[Arc<str>] { &self.labels }

    pub fn node_ids(&self) -> &[NodeId] { &self.node_ids }

    /// True if some edge lacked a length and was counted as 0.
    pub fn missing_lengths(&self) -> bool { self.missing_lengths }

    fn offset(row: usize, col: usize) -> usize { row * (row - 1) / 2 + col }

    pub fn get(&self, i: usize, j: usize) -> Option<TreeFloat> {
        let n = self.len();
        if i >= n || j >= n {
            return None;
        }
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => Some(0.0),
            std::cmp::Ordering::Greater => Some(self.values[Self::offset(i, j)]),
            std::cmp::Ordering::Less => Some(self.values[Self::offset(j, i)]),
        }
    }

    pub fn get_by_labels(&self, a: &str, b: &str) -> Option<TreeFloat> {
        let i = self.labels.iter().position(|l| &**l == a)?;
        let j = self.labels.iter().position(|l| &**l == b)?;
        self.get(i, j)
    }

    /// Rows of the lower triangle: row `i` holds distances to leaves `0..i`.
    pub fn rows(&self) -> impl Iterator<Item = (&Arc<str>, &[TreeFloat])> {
        self.labels.iter().enumerate().map(|(i, label)| {
            let start = if i == 0 { 0 } else { Self::offset(i, 0) };
            (label, &self.values[start..start + i])
        })
    }
}

impl Tree {
    // =========================================================================
    // Orders
    // =========================================================================

    pub fn preorder(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        if !self.nodes.contains_key(node_id) {
            return result;
        }
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.nodes[id].child_ids().iter().rev());
        }
        result
    }

    pub fn preorder_all(&self) -> Vec<NodeId> {
        self.root_id.map(|id| self.preorder(id)).unwrap_or_default()
    }

    /// Children before parents; siblings in reverse pre-order.
    pub fn postorder(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = self.preorder(node_id);
        result.reverse();
        result
    }

    pub fn postorder_all(&self) -> Vec<NodeId> {
        self.root_id.map(|id| self.postorder(id)).unwrap_or_default()
    }

    /// Breadth-first order.
    pub fn levelorder(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        if !self.nodes.contains_key(node_id) {
            return result;
        }
        let mut queue = VecDeque::from([node_id]);
        while let Some(id) = queue.pop_front() {
            result.push(id);
            queue.extend(self.nodes[id].child_ids());
        }
        result
    }

    pub fn tip_node_ids(&self, node_id: NodeId) -> Vec<NodeId> {
        self.preorder(node_id)
            .into_iter()
            .filter(|&id| self.nodes[id].is_tip())
            .collect()
    }

    /// Every leaf, in pre-order.
    pub fn tip_node_ids_all(&self) -> Vec<NodeId> {
        self.root_id.map(|id| self.tip_node_ids(id)).unwrap_or_default()
    }

    pub fn tip_labels(&self) -> Vec<Arc<str>> {
        self.tip_node_ids_all()
            .into_iter()
            .map(|id| Arc::from(self.describe(id)))
            .collect()
    }

    /// `node_id` followed by each of its ancestors up to the root.
    pub fn path_to_root(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.nodes.contains_key(node_id).then_some(node_id);
        while let Some(id) = current {
            path.push(id);
            current = self.nodes[id].parent_id().copied();
        }
        path
    }

    // =========================================================================
    // Depths
    // =========================================================================

    pub(crate) fn depth(&self, node_id: NodeId) -> PathLength {
        let mut depth = PathLength::default();
        let mut current = node_id;
        while let Some(&parent_id) = self.nodes[current].parent_id() {
            depth = depth.extend(self.nodes[current].branch_length());
            current = parent_id;
        }
        depth
    }

    /// Sum of branch lengths from `node_id` up to the root.
    pub fn depth_to_root(&self, node_id: NodeId) -> Result<PathLength, TreeError> {
        _ = self.require(node_id)?;
        Ok(self.depth(node_id))
    }

    pub fn depth_by_label(&self, label: &str) -> Result<PathLength, TreeError> {
        self.depth_to_root(self.require_label(label)?)
    }

    /// Depth of every node, computed top-down in one pass.
    pub(crate) fn depths_all(&self) -> SecondaryMap<NodeId, PathLength> {
        let mut depths: SecondaryMap<NodeId, PathLength> = SecondaryMap::new();
        for id in self.preorder_all() {
            let depth = match self.nodes[id].parent_id() {
                Some(&parent_id) => {
                    depths[parent_id].extend(self.nodes[id].branch_length())
                }
                None => PathLength::default(),
            };
            _ = depths.insert(id, depth);
        }
        depths
    }

    // =========================================================================
    // Common Ancestors & Distances
    // =========================================================================

    pub(crate) fn lca_pair(&self, a: NodeId, b: NodeId) -> NodeId {
        let ancestors: FxHashSet<NodeId> =
            self.path_to_root(a).into_iter().collect();
        self.path_to_root(b)
            .into_iter()
            .find(|id| ancestors.contains(id))
            .unwrap_or(a)
    }

    /// Lowest common ancestor of the given nodes.
    ///
    /// When only one distinct node is given the result is its parent (the
    /// root is its own answer).
    pub fn lca(&self, node_ids: &[NodeId]) -> Result<NodeId, TreeError> {
        if node_ids.is_empty() {
            return Err(TreeError::EmptySelection);
        }
        for &id in node_ids {
            _ = self.require(id)?;
        }

        let mut distinct: Vec<NodeId> = Vec::with_capacity(node_ids.len());
        for &id in node_ids {
            if !distinct.contains(&id) {
                distinct.push(id);
            }
        }

        if let [single] = distinct[..] {
            return Ok(self.parent_id(single).unwrap_or(single));
        }

        Ok(distinct[1..]
            .iter()
            .fold(distinct[0], |acc, &id| self.lca_pair(acc, id)))
    }

    pub fn lca_by_labels<S: AsRef<str>>(
        &self,
        labels: &[S],
    ) -> Result<NodeId, TreeError> {
        self.lca(&self.require_labels(labels)?)
    }

    /// Sum of branch lengths on the path between two nodes.
    pub fn distance(
        &self,
        a: NodeId,
        b: NodeId,
    ) -> Result<PathLength, TreeError> {
        _ = self.require(a)?;
        _ = self.require(b)?;
        let lca = self.lca_pair(a, b);
        let mut length = PathLength::default();
        for start in [a, b] {
            let mut current = start;
            while current != lca {
                length = length.extend(self.nodes[current].branch_length());
                match self.nodes[current].parent_id() {
                    Some(&parent_id) => current = parent_id,
                    None => break,
                }
            }
        }
        Ok(length)
    }

    pub fn distance_by_labels(
        &self,
        a: &str,
        b: &str,
    ) -> Result<PathLength, TreeError> {
        self.distance(self.require_label(a)?, self.require_label(b)?)
    }

    /// Distances between all pairs of leaves.
    ///
    /// Each pair is computed exactly once, at its lowest common ancestor `v`,
    /// as `depth(x) + depth(y) - 2 * depth(v)`. Ancestors are processed
    /// independently, in parallel for large trees.
    pub fn distance_matrix(&self) -> DistanceMatrix {
        let node_ids = self.tip_node_ids_all();
        let labels: Vec<Arc<str>> =
            node_ids.iter().map(|&id| Arc::from(self.describe(id))).collect();
        let tip_index: FxHashMap<NodeId, usize> =
            node_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let depths = self.depths_all();
        let mut missing: SecondaryMap<NodeId, usize> = SecondaryMap::new();
        for id in self.preorder_all() {
            let count = match self.nodes[id].parent_id() {
                Some(&parent_id) => {
                    missing[parent_id]
                        + usize::from(self.nodes[id].branch_length().is_none())
                }
                None => 0,
            };
            _ = missing.insert(id, count);
        }

        let pairs_below = |v: NodeId| -> Vec<(usize, PathLength)> {
            let groups: Vec<Vec<usize>> = self.nodes[v]
                .child_ids()
                .iter()
                .map(|&c| {
                    self.tip_node_ids(c).iter().map(|id| tip_index[id]).collect()
                })
                .collect();
            let mut pairs = Vec::new();
            for (g, left) in groups.iter().enumerate() {
                for right in &groups[g + 1..] {
                    for &x in left {
                        for &y in right {
                            let (row, col) = if x > y { (x, y) } else { (y, x) };
                            let (nx, ny) = (node_ids[x], node_ids[y]);
                            let value = depths[nx].value + depths[ny].value
                                - 2.0 * depths[v].value;
                            let missing_lengths =
                                missing[nx] + missing[ny] > 2 * missing[v];
                            pairs.push((
                                DistanceMatrix::offset(row, col),
                                PathLength { value, missing_lengths },
                            ));
                        }
                    }
                }
            }
            pairs
        };

        let internal: Vec<NodeId> = self
            .preorder_all()
            .into_iter()
            .filter(|&id| self.nodes[id].child_node_count() > 1)
            .collect();

        let blocks: Vec<Vec<(usize, PathLength)>> =
            if node_ids.len() > PARALLEL_TIP_THRESHOLD {
                internal.par_iter().map(|&v| pairs_below(v)).collect()
            } else {
                internal.iter().map(|&v| pairs_below(v)).collect()
            };

        let n = node_ids.len();
        let mut values = vec![0.0; n * n.saturating_sub(1) / 2];
        let mut missing_lengths = false;
        for (offset, length) in blocks.into_iter().flatten() {
            values[offset] = length.value;
            missing_lengths |= length.missing_lengths;
        }

        DistanceMatrix { node_ids, labels, values, missing_lengths }
    }

    // =========================================================================
    // Walk
    // =========================================================================

    /// Depth-first walk over the whole tree starting at leaf `start`,
    /// reporting every other leaf in the order it is reached.
    ///
    /// Edges are identified by their child node; an edge that has been
    /// crossed is never counted again in `traveled`.
    pub fn walk(&self, start: NodeId) -> Result<Vec<WalkStep>, TreeError> {
        if !self.require(start)?.is_tip() {
            return Err(TreeError::NotALeaf(self.describe(start)));
        }

        let mut steps = Vec::new();
        let mut crossed: FxHashSet<NodeId> = FxHashSet::default();
        let mut traveled = PathLength::default();
        let mut stack: Vec<(NodeId, Option<NodeId>, PathLength)> =
            vec![(start, None, PathLength::default())];

        while let Some((node_id, came_from, distance)) = stack.pop() {
            if let Some(from) = came_from {
                let edge = self.edge_between(from, node_id);
                if crossed.insert(edge) {
                    traveled = traveled.extend(self.nodes[edge].branch_length());
                }
            }

            let node = &self.nodes[node_id];
            if node.is_tip() && node_id != start {
                steps.push(WalkStep {
                    node_id,
                    label: Arc::from(self.describe(node_id)),
                    distance,
                    traveled,
                });
            }

            if let Some(&parent_id) = node.parent_id()
                && came_from != Some(parent_id)
                && !crossed.contains(&node_id)
            {
                stack.push((
                    parent_id,
                    Some(node_id),
                    distance.extend(node.branch_length()),
                ));
            }
            for &child_id in node.child_ids().iter().rev() {
                if came_from != Some(child_id) && !crossed.contains(&child_id) {
                    stack.push((
                        child_id,
                        Some(node_id),
                        distance.extend(self.nodes[child_id].branch_length()),
                    ));
                }
            }
        }

        Ok(steps)
    }

    pub fn walk_from_label(&self, label: &str) -> Result<Vec<WalkStep>, TreeError> {
        self.walk(self.require_label(label)?)
    }

    /// The node below the edge joining two adjacent nodes.
    fn edge_between(&self, a: NodeId, b: NodeId) -> NodeId {
        if self.nodes[b].parent_id() == Some(&a) { b } else { a }
    }
}

#[cfg(test)]
mod tests {
    use crate::parsers::newick::parse_newick;

    #[test]
    fn test_orders() {
        let tree = parse_newick("((A,B)X,(C,D)Y)R;").unwrap();
        let labels = |ids: Vec<_>| -> Vec<String> {
            ids.into_iter().map(|id| tree.describe(id)).collect()
        };
        let root = tree.root_id().unwrap();
        assert_eq!(labels(tree.preorder(root)), ["R", "X", "A", "B", "Y", "C", "D"]);
        assert_eq!(labels(tree.levelorder(root)), ["R", "X", "Y", "A", "B", "C", "D"]);
        assert_eq!(labels(tree.postorder(root)), ["D", "C", "Y", "B", "A", "X", "R"]);
    }

    #[test]
    fn test_path_length_flags_missing_lengths() {
        let tree = parse_newick("((A:1,B)X:2,C:3)R;").unwrap();
        let a = tree.depth_by_label("A").unwrap();
        assert_eq!(a.value, 3.0);
        assert!(a.is_exact());
        let b = tree.depth_by_label("B").unwrap();
        assert_eq!(b.value, 2.0);
        assert!(!b.is_exact());
    }

    #[test]
    fn test_walk_backtracking_does_not_count_edges_twice() {
        let tree = parse_newick("((A:1,B:2):3,C:4);").unwrap();
        let steps = tree.walk_from_label("A").unwrap();
        let seen: Vec<(&str, f64, f64)> = steps
            .iter()
            .map(|s| (&*s.label, s.distance.value, s.traveled.value))
            .collect();
        assert_eq!(seen, [("B", 3.0, 3.0), ("C", 8.0, 10.0)]);
        assert!(steps.iter().all(|s| s.traveled.is_exact()));
    }

    #[test]
    fn test_walk_flags_missing_lengths() {
        let tree = parse_newick("((A:1,B:2):3,(C,D:1):4);").unwrap();
        let steps = tree.walk_from_label("A").unwrap();
        let flags: Vec<(&str, bool, bool)> = steps
            .iter()
            .map(|s| (&*s.label, s.distance.is_exact(), s.traveled.is_exact()))
            .collect();
        assert_eq!(
            flags,
            [("B", true, true), ("C", false, false), ("D", true, false)]
        );
    }
}
