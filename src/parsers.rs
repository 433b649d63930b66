pub(crate) mod newick;

use crate::phylo::{ErrorKind, Tree, TreeError};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Serialization formats understood by the codec.
///
/// `Newick` skips bracket comments; `Nhx` reads `[&key=value]` comment
/// blocks into support, length and metadata. `Text` is output-only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeFormat {
    #[default]
    Newick,
    Nhx,
    Text,
}

impl Display for TreeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TreeFormat::Newick => "newick",
                TreeFormat::Nhx => "nhx",
                TreeFormat::Text => "text",
            }
        )
    }
}

impl FromStr for TreeFormat {
    type Err = TreeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newick" | "nwk" | "tre" => Ok(TreeFormat::Newick),
            "nhx" | "extended" => Ok(TreeFormat::Nhx),
            "text" | "txt" => Ok(TreeFormat::Text),
            other => Err(TreeParseError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeParseError {
    #[error("Input contains no tree.")]
    EmptyInput,
    #[error("Input is not valid UTF-8 after byte {0}.")]
    InvalidEncoding(usize),
    #[error("Missing ';' at the end of the tree (offset {0}).")]
    MissingTerminator(usize),
    #[error("Unbalanced parenthesis at offset {0}.")]
    UnbalancedParenthesis(usize),
    #[error("Quoted label starting at offset {0} is never closed.")]
    UnterminatedQuote(usize),
    #[error("Comment starting at offset {0} is never closed.")]
    UnterminatedComment(usize),
    #[error("Unexpected character '{character}' at offset {offset}.")]
    UnexpectedCharacter { character: char, offset: usize },
    #[error("'{token}' at offset {offset} is not a valid number.")]
    InvalidNumber { token: String, offset: usize },
    #[error("Unknown tree format '{0}'.")]
    UnknownFormat(String),
    #[error("Format '{0}' can be written but not read.")]
    UnsupportedFormat(TreeFormat),
    #[error(transparent)]
    Structure(#[from] TreeError),
}

impl TreeParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeParseError::Structure(err) => err.kind(),
            TreeParseError::UnknownFormat(_)
            | TreeParseError::UnsupportedFormat(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::Format,
        }
    }

    /// Byte offset of the offending input, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            TreeParseError::InvalidEncoding(offset)
            | TreeParseError::MissingTerminator(offset)
            | TreeParseError::UnbalancedParenthesis(offset)
            | TreeParseError::UnterminatedQuote(offset)
            | TreeParseError::UnterminatedComment(offset)
            | TreeParseError::UnexpectedCharacter { offset, .. }
            | TreeParseError::InvalidNumber { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Parses the first tree in `s`; anything after its terminating `;` is
/// ignored.
pub fn parse_tree(s: &str, format: TreeFormat) -> Result<Tree, TreeParseError> {
    match format {
        TreeFormat::Newick => newick::parse_newick(s),
        TreeFormat::Nhx => newick::parse_nhx(s),
        TreeFormat::Text => Err(TreeParseError::UnsupportedFormat(format)),
    }
}

/// Reads a tree from raw bytes, which must be UTF-8.
pub fn parse_tree_bytes(
    bytes: &[u8],
    format: TreeFormat,
) -> Result<Tree, TreeParseError> {
    let s = std::str::from_utf8(bytes)
        .map_err(|err| TreeParseError::InvalidEncoding(err.valid_up_to()))?;
    parse_tree(s, format)
}
