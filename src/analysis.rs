//! Summary statistics computed from a [`Tree`](crate::Tree).

mod abundance;
mod consistency;
mod ltt;
mod shape;
mod subsample;

pub use abundance::{AbundanceRow, edge_length_abundance};
pub use consistency::{ConsistencyRow, TraitTable, consistency_index};
pub use ltt::{LttRow, lineages_through_time};
pub use shape::{ShapeRow, SisterMatrix, sister_pairs, tree_shape};
pub use subsample::random_subsample;

use crate::phylo::{NodeId, Tree};
use slotmap::SecondaryMap;

/// Number of leaves at or below every node, in one post-order pass.
pub(crate) fn leaf_counts(tree: &Tree) -> SecondaryMap<NodeId, usize> {
    let mut counts: SecondaryMap<NodeId, usize> = SecondaryMap::new();
    for node_id in tree.postorder_all() {
        let count = match tree.child_ids(node_id) {
            [] => 1,
            child_ids => child_ids.iter().map(|&id| counts[id]).sum(),
        };
        _ = counts.insert(node_id, count);
    }
    counts
}
