use super::{NodeId, Tree, TreeFloat};
use rayon::prelude::*;
use slotmap::SecondaryMap;
use std::sync::Arc;

/// One node of a tree laid out for drawing: horizontal extent of the edge
/// above the node and the node's vertical position.
///
/// `x0`/`x1` are absolute depths (absent lengths count as 0); tips are spaced
/// evenly on `y` in pre-order and an internal node sits midway between its
/// outermost children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutRow {
    pub parent_node_id: Option<NodeId>,
    pub node_id: NodeId,
    pub label: Option<Arc<str>>,
    pub branch_length: Option<TreeFloat>,
    pub x0: TreeFloat,
    pub x1: TreeFloat,
    pub y: TreeFloat,
    pub y_parent: Option<TreeFloat>,
    pub is_tip: bool,
}

pub fn flatten_tree(tree: &Tree) -> Vec<LayoutRow> {
    let Some(root_id) = tree.root_id() else {
        return Vec::new();
    };

    let depths = tree.depths_all();
    let tip_ids = tree.tip_node_ids(root_id);
    let step = match tip_ids.len() {
        0 | 1 => 0e0,
        n => 1e0 / (n - 1) as TreeFloat,
    };

    let mut ys: SecondaryMap<NodeId, TreeFloat> = SecondaryMap::new();
    for (i, &tip_id) in tip_ids.iter().enumerate() {
        _ = ys.insert(tip_id, i as TreeFloat * step);
    }
    for node_id in tree.postorder(root_id) {
        let child_ids = tree.child_ids(node_id);
        if let (Some(first), Some(last)) = (child_ids.first(), child_ids.last())
        {
            let y = ys[*first].midpoint(ys[*last]);
            _ = ys.insert(node_id, y);
        }
    }

    let mut rows: Vec<LayoutRow> = tree
        .preorder(root_id)
        .into_iter()
        .map(|node_id| {
            let parent_node_id = tree.parent_id(node_id);
            let x1 = depths.get(node_id).map(|d| d.value).unwrap_or_default();
            let x0 = parent_node_id
                .and_then(|p| depths.get(p))
                .map(|d| d.value)
                .unwrap_or(x1);
            let y = ys[node_id];
            LayoutRow {
                parent_node_id,
                node_id,
                label: tree.label(node_id),
                branch_length: tree.branch_length(node_id),
                x0,
                x1,
                y,
                y_parent: parent_node_id
                    .map(|p| ys[p])
                    .filter(|&p_y| p_y != y),
                is_tip: tree.is_tip(node_id),
            }
        })
        .collect();

    rows.par_sort_by(|a, b| a.y.total_cmp(&b.y));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::newick::parse_newick;

    #[test]
    fn test_flatten_positions() {
        let tree = parse_newick("((A:1,B:2)X:3,C:4)R;").unwrap();
        let rows = flatten_tree(&tree);
        assert_eq!(rows.len(), 5);

        let row = |label: &str| {
            rows.iter()
                .find(|r| r.label.as_deref() == Some(label))
                .unwrap()
                .clone()
        };
        assert_eq!(row("A").y, 0.0);
        assert_eq!(row("B").y, 0.5);
        assert_eq!(row("C").y, 1.0);
        assert_eq!(row("X").y, 0.25);
        assert_eq!(row("R").y, 0.625);
        assert_eq!((row("B").x0, row("B").x1), (3.0, 5.0));
        assert_eq!(row("B").y_parent, Some(0.25));
        assert_eq!(row("R").parent_node_id, None);
        assert!(row("C").is_tip);
    }
}
