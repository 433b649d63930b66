use super::leaf_counts;
use crate::phylo::{Tree, TreeError, TreeFloat};
use std::collections::BTreeMap;

/// Edges grouped by how many leaves they subtend.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRow {
    pub leaves_subtended: usize,
    pub edge_count: usize,
    pub total_length: TreeFloat,
    /// Share of the tree's total length carried by these edges.
    pub fraction: TreeFloat,
}

/// Edge-length abundance distribution, ordered by clade size.
///
/// Every edge below the root must have a length.
pub fn edge_length_abundance(tree: &Tree) -> Result<Vec<AbundanceRow>, TreeError> {
    tree.require_branch_lengths()?;
    let counts = leaf_counts(tree);

    let mut groups: BTreeMap<usize, (usize, TreeFloat)> = BTreeMap::new();
    for node_id in tree.edge_node_ids() {
        let group = groups.entry(counts[node_id]).or_default();
        group.0 += 1;
        group.1 += tree.branch_length(node_id).unwrap_or_default();
    }

    let total = tree.total_length();
    Ok(groups
        .into_iter()
        .map(|(leaves_subtended, (edge_count, total_length))| AbundanceRow {
            leaves_subtended,
            edge_count,
            total_length,
            fraction: if total > 0e0 { total_length / total } else { 0e0 },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::newick::parse_newick;
    use crate::phylo::ErrorKind;

    #[test]
    fn test_abundance_groups_by_clade_size() {
        let tree = parse_newick("((A:1,B:1):2,(C:1,D:3):4);").unwrap();
        let rows = edge_length_abundance(&tree).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            AbundanceRow {
                leaves_subtended: 1,
                edge_count: 4,
                total_length: 6.0,
                fraction: 0.5
            }
        );
        assert_eq!((rows[1].leaves_subtended, rows[1].edge_count), (2, 2));
        assert_eq!(rows[1].total_length, 6.0);
    }

    #[test]
    fn test_abundance_requires_lengths() {
        let tree = parse_newick("((A:1,B):2,C:1);").unwrap();
        let err = edge_length_abundance(&tree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingData);
    }
}
