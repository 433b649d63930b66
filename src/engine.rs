use crate::analysis::{self, TraitTable};
use crate::config::EngineConfig;
use crate::parsers::newick::{write_newick, write_nhx};
use crate::parsers::{TreeFormat, TreeParseError, parse_tree_bytes};
use crate::phylo::{
    ErrorKind, SwapVariants, Tree, TreeError, TreeFloat, flatten_tree,
};
use crate::report::Report;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] TreeParseError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Configuration error: {0}.")]
    Config(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Parse(err) => err.kind(),
            EngineError::Tree(err) => err.kind(),
            EngineError::Config(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// One operation to run on a parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSpec {
    // Queries
    TotalLength,
    OtuCount,
    OtuList,
    Depth { label: String },
    /// Yields the clade below the common ancestor.
    Lca { labels: Vec<String> },
    Distance { a: String, b: String },
    DistanceMatrix,
    Walk { start: String },
    LabelInternalNodes,
    TextLayout,

    // Mutations
    Reroot { label: String },
    MidpointReroot,
    Subset { labels: Vec<String> },
    DeleteOtus { labels: Vec<String> },
    DeleteLowSupport { threshold: TreeFloat },
    ForceBifurcating,
    CleanLengths,
    CleanSupport,
    SwapOtus { label: String },
    SuppressUnaryNodes,
    Ladderize { reverse: bool },

    // Statistics
    EdgeLengthAbundance,
    ConsistencyIndex { traits: TraitTable },
    /// Uses the configured bin count when `bins` is `None`.
    LineagesThroughTime { bins: Option<usize> },
    TreeShape,
    SisterPairs,
    RandomSubsample { size: usize },
}

/// What an operation produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Tree(Tree),
    /// One tree per swap partner, built as the sequence is consumed.
    Variants(SwapVariants),
    Report(Report),
}

impl From<Report> for Outcome {
    fn from(report: Report) -> Self { Outcome::Report(report) }
}

/// Parses serialized input into a tree.
pub fn build_tree(bytes: &[u8], format: TreeFormat) -> Result<Tree, EngineError> {
    Ok(parse_tree_bytes(bytes, format)?)
}

/// Runs one operation. Randomised operations draw from the generator the
/// configuration describes.
pub fn apply(
    tree: Tree,
    operation: &OperationSpec,
    config: &EngineConfig,
) -> Result<Outcome, EngineError> {
    let mut rng = config.rng();
    apply_with_rng(tree, operation, config, &mut rng)
}

/// Like [`apply`], with an explicit source of randomness.
pub fn apply_with_rng<R: Rng + ?Sized>(
    mut tree: Tree,
    operation: &OperationSpec,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Outcome, EngineError> {
    debug!("applying {operation:?}");
    let outcome: Outcome = match operation {
        OperationSpec::TotalLength => {
            let report = Report::Scalar {
                value: tree.total_length().into(),
                unitless: !tree.has_branch_lengths(),
            };
            report.into()
        }
        OperationSpec::OtuCount => Report::scalar(tree.tip_count()).into(),
        OperationSpec::OtuList => Report::Labels(tree.tip_labels()).into(),
        OperationSpec::Depth { label } => {
            Report::from(tree.depth_by_label(label)?).into()
        }
        OperationSpec::Lca { labels } => {
            let lca = tree.lca_by_labels(labels)?;
            Outcome::Tree(tree.subtree(lca)?)
        }
        OperationSpec::Distance { a, b } => {
            Report::from(tree.distance_by_labels(a, b)?).into()
        }
        OperationSpec::DistanceMatrix => {
            let matrix = tree.distance_matrix();
            if matrix.missing_lengths() {
                warn!("some branch lengths are missing and were counted as 0");
            }
            Report::from(&matrix).into()
        }
        OperationSpec::Walk { start } => {
            Report::from(tree.walk_from_label(start)?).into()
        }
        OperationSpec::LabelInternalNodes => {
            _ = tree.label_internal_nodes(&config.internal_label_prefix);
            Outcome::Tree(tree)
        }
        OperationSpec::TextLayout => Report::from(flatten_tree(&tree)).into(),

        OperationSpec::Reroot { label } => {
            _ = tree.reroot_by_label(label)?;
            Outcome::Tree(tree)
        }
        OperationSpec::MidpointReroot => {
            _ = tree.midpoint_reroot()?;
            Outcome::Tree(tree)
        }
        OperationSpec::Subset { labels } => {
            Outcome::Tree(tree.subset_by_labels(labels)?)
        }
        OperationSpec::DeleteOtus { labels } => {
            _ = tree.delete_otus(labels)?;
            Outcome::Tree(tree)
        }
        OperationSpec::DeleteLowSupport { threshold } => {
            _ = tree.delete_low_support(*threshold)?;
            Outcome::Tree(tree)
        }
        OperationSpec::ForceBifurcating => {
            _ = tree.force_bifurcating(rng);
            Outcome::Tree(tree)
        }
        OperationSpec::CleanLengths => {
            tree.clean_lengths();
            Outcome::Tree(tree)
        }
        OperationSpec::CleanSupport => {
            tree.clean_support();
            Outcome::Tree(tree)
        }
        OperationSpec::SwapOtus { label } => {
            Outcome::Variants(tree.into_swap_variants(label)?)
        }
        OperationSpec::SuppressUnaryNodes => {
            _ = tree.suppress_unary_nodes();
            Outcome::Tree(tree)
        }
        OperationSpec::Ladderize { reverse } => {
            tree.ladderize(*reverse);
            Outcome::Tree(tree)
        }

        OperationSpec::EdgeLengthAbundance => {
            Report::from(analysis::edge_length_abundance(&tree)?).into()
        }
        OperationSpec::ConsistencyIndex { traits } => {
            Report::from(analysis::consistency_index(&tree, traits)?).into()
        }
        OperationSpec::LineagesThroughTime { bins } => {
            let bins = bins.unwrap_or(config.ltt_bins);
            Report::from(analysis::lineages_through_time(&tree, bins)?).into()
        }
        OperationSpec::TreeShape => Report::from(analysis::tree_shape(&tree)).into(),
        OperationSpec::SisterPairs => {
            Report::from(analysis::sister_pairs(&tree)).into()
        }
        OperationSpec::RandomSubsample { size } => {
            Outcome::Tree(analysis::random_subsample(&tree, *size, rng)?)
        }
    };
    Ok(outcome)
}

/// Serializes an outcome. Trees use `format`, one per line; reports are
/// always delimited text. Swap variants are rendered from a restarted copy
/// of the sequence, so the outcome itself is not consumed.
pub fn render(outcome: &Outcome, format: TreeFormat, config: &EngineConfig) -> Vec<u8> {
    let render_tree = |tree: &Tree| -> String {
        match format {
            TreeFormat::Newick => format!("{}\n", write_newick(tree)),
            TreeFormat::Nhx => format!("{}\n", write_nhx(tree)),
            TreeFormat::Text => Report::from(flatten_tree(tree))
                .render(&config.delimiter, config.precision),
        }
    };

    let text = match outcome {
        Outcome::Tree(tree) => render_tree(tree),
        Outcome::Variants(variants) => {
            let mut variants = variants.clone();
            variants.restart();
            variants.map(|variant| render_tree(&variant.tree)).collect()
        }
        Outcome::Report(report) => {
            report.render(&config.delimiter, config.precision)
        }
    };
    text.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str, operation: OperationSpec) -> String {
        let config = EngineConfig::default();
        let tree = build_tree(input.as_bytes(), TreeFormat::Newick).unwrap();
        let outcome = apply(tree, &operation, &config).unwrap();
        String::from_utf8(render(&outcome, TreeFormat::Newick, &config)).unwrap()
    }

    #[test]
    fn test_scenario() {
        let input = "(A:1,(B:2,C:3)80:4):0;";
        assert_eq!(run(input, OperationSpec::TotalLength), "10\n");
        assert_eq!(run(input, OperationSpec::OtuCount), "3\n");
        assert_eq!(run(input, OperationSpec::OtuList), "A\nB\nC\n");
        assert_eq!(
            run(input, OperationSpec::Lca { labels: vec!["B".into(), "C".into()] }),
            "(B:2,C:3)80:4;\n"
        );
        assert_eq!(
            run(input, OperationSpec::DeleteLowSupport { threshold: 90.0 }),
            "(A:1,B:6,C:7):0;\n"
        );
    }

    #[test]
    fn test_errors_carry_kind() {
        let config = EngineConfig::default();
        let err = build_tree(b"(A,B", TreeFormat::Newick).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);

        let tree = build_tree(b"(A,B);", TreeFormat::Newick).unwrap();
        let err = apply(
            tree,
            &OperationSpec::Reroot { label: "Z".to_string() },
            &config,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
