use crate::phylo::{Tree, TreeError};
use rand::Rng;
use rand::seq::index;
use tracing::debug;

/// The subtree induced by `size` leaves drawn uniformly without replacement.
pub fn random_subsample<R: Rng + ?Sized>(
    tree: &Tree,
    size: usize,
    rng: &mut R,
) -> Result<Tree, TreeError> {
    let tip_ids = tree.tip_node_ids_all();
    if size == 0 {
        return Err(TreeError::EmptySelection);
    }
    if size > tip_ids.len() {
        return Err(TreeError::SampleTooLarge {
            requested: size,
            available: tip_ids.len(),
        });
    }

    let mut picked = index::sample(rng, tip_ids.len(), size).into_vec();
    picked.sort_unstable();
    let selected: Vec<_> = picked.into_iter().map(|i| tip_ids[i]).collect();
    debug!("sampled {size} of {} leaves", tip_ids.len());
    tree.subset(&selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::newick::parse_newick;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_subsample_is_reproducible() {
        let tree = parse_newick("((A:1,B:2):1,(C:3,(D:1,E:1):2):1,F:5);").unwrap();
        let a = random_subsample(&tree, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = random_subsample(&tree, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.tip_labels(), b.tip_labels());
        assert_eq!(a.tip_count(), 3);
        assert!(a.tip_labels().iter().all(|l| tree.node_id_by_label(l.as_ref()).is_some()));
    }

    #[test]
    fn test_subsample_size_limits() {
        let tree = parse_newick("(A,B,C);").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            random_subsample(&tree, 4, &mut rng).unwrap_err(),
            TreeError::SampleTooLarge { requested: 4, available: 3 }
        );
        assert_eq!(
            random_subsample(&tree, 0, &mut rng).unwrap_err(),
            TreeError::EmptySelection
        );
        assert_eq!(random_subsample(&tree, 3, &mut rng).unwrap().tip_count(), 3);
    }
}
