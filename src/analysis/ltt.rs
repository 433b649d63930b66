use crate::phylo::{Tree, TreeError, TreeFloat};

/// Number of lineages alive within one height bin.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LttRow {
    /// 1-based bin number, counted from the root.
    pub bin: usize,
    pub count: usize,
    pub floor: TreeFloat,
    pub ceiling: TreeFloat,
}

/// Lineages through time over `bins` equal slices of the root-to-tip height.
///
/// An edge spanning depths `[start, end]` counts towards a bin `[floor,
/// ceiling)` when `start < ceiling` and `end > floor`. The last ceiling is
/// the tree height exactly.
pub fn lineages_through_time(
    tree: &Tree,
    bins: usize,
) -> Result<Vec<LttRow>, TreeError> {
    if bins == 0 {
        return Err(TreeError::InvalidArgument(
            "the number of bins must be positive".to_string(),
        ));
    }
    tree.require_branch_lengths()?;
    let height = tree.height();
    if height <= 0e0 {
        return Err(TreeError::MissingData(
            "the tree has zero height".to_string(),
        ));
    }

    let depths = tree.depths_all();
    let spans: Vec<(TreeFloat, TreeFloat)> = tree
        .edge_node_ids()
        .into_iter()
        .filter_map(|node_id| {
            let parent_id = tree.parent_id(node_id)?;
            Some((depths[parent_id].value, depths[node_id].value))
        })
        .collect();

    let width = height / bins as TreeFloat;
    Ok((0..bins)
        .map(|bin| {
            let floor = bin as TreeFloat * width;
            let ceiling =
                if bin + 1 == bins { height } else { (bin + 1) as TreeFloat * width };
            let count = spans
                .iter()
                .filter(|&&(start, end)| start < ceiling && end > floor)
                .count();
            LttRow { bin: bin + 1, count, floor, ceiling }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::newick::parse_newick;

    #[test]
    fn test_ltt_counts_lineages() {
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        let rows = lineages_through_time(&tree, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].bin, rows[0].count), (1, 2));
        assert_eq!((rows[0].floor, rows[0].ceiling), (0.0, 1.0));
        assert_eq!((rows[1].bin, rows[1].count), (2, 3));
        assert_eq!(rows[1].ceiling, 2.0);
    }

    #[test]
    fn test_ltt_rejects_bad_input() {
        let tree = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        assert!(matches!(
            lineages_through_time(&tree, 0),
            Err(TreeError::InvalidArgument(_))
        ));
        let tree = parse_newick("((A,B):1,C:2);").unwrap();
        assert!(matches!(
            lineages_through_time(&tree, 4),
            Err(TreeError::MissingBranchLength(_))
        ));
        let tree = parse_newick("(A:0,B:0);").unwrap();
        assert!(matches!(
            lineages_through_time(&tree, 4),
            Err(TreeError::MissingData(_))
        ));
    }
}
