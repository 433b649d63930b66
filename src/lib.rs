mod analysis;
mod config;
mod engine;
mod parsers;
mod phylo;
mod report;

pub use analysis::{
    AbundanceRow, ConsistencyRow, LttRow, ShapeRow, SisterMatrix, TraitTable,
    consistency_index, edge_length_abundance, lineages_through_time,
    random_subsample, sister_pairs, tree_shape,
};
pub use config::EngineConfig;
pub use engine::{
    EngineError, OperationSpec, Outcome, apply, apply_with_rng, build_tree,
    render,
};
pub use parsers::newick::{parse_newick, parse_nhx, write_newick, write_nhx};
pub use parsers::{TreeFormat, TreeParseError, parse_tree, parse_tree_bytes};
pub use phylo::{
    AttributeKind, DistanceMatrix, ErrorKind, INTERNAL_LABEL_PREFIX,
    LENGTH_KEYS, LayoutRow, Metadata, Node, NodeId, NodeType, PathLength,
    SUPPORT_KEYS, SwapVariant, SwapVariants, Tree, TreeError, TreeFloat,
    WalkStep, flatten_tree,
};
pub use report::{Report, Value};
