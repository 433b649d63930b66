use super::leaf_counts;
use crate::phylo::{NodeId, Tree};
use std::sync::Arc;

/// Children profile of one internal node.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRow {
    /// 1-based position of the node in pre-order among internal nodes.
    pub index: usize,
    pub node_id: NodeId,
    pub label: Option<Arc<str>>,
    pub child_count: usize,
    /// Leaves below each child, in child order.
    pub leaves_per_child: Vec<usize>,
}

/// One row per internal node, in pre-order.
pub fn tree_shape(tree: &Tree) -> Vec<ShapeRow> {
    let counts = leaf_counts(tree);
    tree.preorder_all()
        .into_iter()
        .filter(|&node_id| !tree.is_tip(node_id))
        .enumerate()
        .map(|(i, node_id)| {
            let child_ids = tree.child_ids(node_id);
            ShapeRow {
                index: i + 1,
                node_id,
                label: tree.label(node_id),
                child_count: child_ids.len(),
                leaves_per_child: child_ids.iter().map(|&id| counts[id]).collect(),
            }
        })
        .collect()
}

/// Leaf-by-leaf sister relation. The diagonal is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SisterMatrix {
    pub labels: Vec<Arc<str>>,
    pub values: Vec<Vec<Option<u8>>>,
}

/// Marks two leaves as sisters when they are the two children of a cherry.
/// Leaves are ordered as in pre-order.
pub fn sister_pairs(tree: &Tree) -> SisterMatrix {
    let tip_ids = tree.tip_node_ids_all();
    let sister_of = |node_id: NodeId| -> Option<NodeId> {
        let parent_id = tree.parent_id(node_id)?;
        match tree.child_ids(parent_id) {
            &[a, b] if tree.is_tip(a) && tree.is_tip(b) => {
                Some(if a == node_id { b } else { a })
            }
            _ => None,
        }
    };

    let values = tip_ids
        .iter()
        .map(|&row_id| {
            let sister = sister_of(row_id);
            tip_ids
                .iter()
                .map(|&col_id| match col_id == row_id {
                    true => None,
                    false => Some(u8::from(sister == Some(col_id))),
                })
                .collect()
        })
        .collect();

    SisterMatrix { labels: tree.tip_labels(), values }
}
