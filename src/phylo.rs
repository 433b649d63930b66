pub(crate) mod attribute;
mod flatten;
pub(crate) mod node;
pub(crate) mod tree;

pub type TreeFloat = f64;

pub use attribute::{AttributeKind, LENGTH_KEYS, Metadata, SUPPORT_KEYS};
pub use flatten::{LayoutRow, flatten_tree};
pub use node::{Node, NodeId, NodeType};
pub use tree::{
    DistanceMatrix, ErrorKind, INTERNAL_LABEL_PREFIX, PathLength, SwapVariant,
    SwapVariants, Tree, TreeError, WalkStep,
};
