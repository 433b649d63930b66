pub(crate) mod attributes;
pub(crate) mod validation;

use crate::parsers::TreeParseError;
use crate::phylo::attribute::{AttributeKind, SUPPORT_KEYS};
use crate::phylo::node::{Node, NodeId};
use crate::phylo::tree::Tree;
use crate::phylo::TreeFloat;
use attributes::{format_comment, is_label_delimiter, parse_comment, quote_label};
use tracing::debug;
use validation::validate_newick_structure;

/// Whether bracket comments are read as attribute blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Plain,
    Nhx,
}

// =============================================================================
// Reading
// =============================================================================

/// Parses a NEWICK string; bracket comments are skipped.
pub fn parse_newick(s: &str) -> Result<Tree, TreeParseError> {
    parse(s, Flavor::Plain)
}

/// Parses a NEWICK string whose bracket comments carry `key=value` pairs.
pub fn parse_nhx(s: &str) -> Result<Tree, TreeParseError> {
    parse(s, Flavor::Nhx)
}

fn parse(s: &str, flavor: Flavor) -> Result<Tree, TreeParseError> {
    let terminator = validate_newick_structure(s)?;
    let rest = s[terminator + 1..].trim();
    if !rest.is_empty() {
        debug!("ignoring {} bytes after the first tree", rest.len());
    }

    let mut parser = Parser { text: &s[..=terminator], position: 0, flavor };
    let tree = parser.parse_tree()?;
    debug!(
        "parsed tree: {} nodes, {} tips",
        tree.node_count(),
        tree.tip_count()
    );
    Ok(tree)
}

/// Reader over a pre-validated tree string. Open clades are kept on an
/// explicit stack rather than the call stack.
struct Parser<'a> {
    text: &'a str,
    position: usize,
    flavor: Flavor,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> { self.text.as_bytes().get(self.position).copied() }

    fn unexpected(&self) -> TreeParseError {
        match self.text[self.position..].chars().next() {
            Some(character) => TreeParseError::UnexpectedCharacter {
                character,
                offset: self.position,
            },
            None => TreeParseError::MissingTerminator(self.position),
        }
    }

    fn parse_tree(&mut self) -> Result<Tree, TreeParseError> {
        let mut tree = Tree::new();
        let mut open: Vec<NodeId> = Vec::new();

        self.skip_trivia(None)?;
        if self.peek() == Some(b';') {
            return Err(TreeParseError::EmptyInput);
        }

        'subtree: loop {
            self.skip_trivia(None)?;
            if self.peek() == Some(b'(') {
                self.position += 1;
                let id = tree.add_node(Node::new(), open.last().copied())?;
                open.push(id);
                continue;
            }

            let leaf_id = tree.add_node(Node::new(), open.last().copied())?;
            self.node_info(&mut tree, leaf_id, false)?;

            loop {
                self.skip_trivia(None)?;
                match self.peek() {
                    Some(b',') if !open.is_empty() => {
                        self.position += 1;
                        continue 'subtree;
                    }
                    Some(b')') => {
                        let Some(clade_id) = open.pop() else {
                            return Err(TreeParseError::UnbalancedParenthesis(
                                self.position,
                            ));
                        };
                        self.position += 1;
                        self.node_info(&mut tree, clade_id, true)?;
                    }
                    Some(b';') if open.is_empty() => return Ok(tree),
                    _ => return Err(self.unexpected()),
                }
            }
        }
    }

    /// Reads the label, length and comments that follow a node.
    fn node_info(
        &mut self,
        tree: &mut Tree,
        node_id: NodeId,
        after_clade: bool,
    ) -> Result<(), TreeParseError> {
        let mut comments: Vec<(usize, &'a str)> = Vec::new();
        self.skip_trivia(Some(&mut comments))?;

        if let Some((token, quoted)) = self.label()? {
            match token.parse::<TreeFloat>() {
                Ok(support) if after_clade && !quoted && support.is_finite() => {
                    if let Some(node) = tree.node_mut(node_id) {
                        node.set_support(Some(support));
                    }
                }
                _ => tree.set_label(node_id, Some(token.as_str()))?,
            }
        }

        self.skip_trivia(Some(&mut comments))?;
        if self.peek() == Some(b':') {
            self.position += 1;
            self.skip_trivia(Some(&mut comments))?;
            let (token, offset) = self.token();
            let length = parse_number(token, offset)?;
            if let Some(node) = tree.node_mut(node_id) {
                node.set_branch_length(Some(length));
            }
            self.skip_trivia(Some(&mut comments))?;
        }

        for (offset, comment) in comments {
            apply_comment(tree, node_id, comment, offset)?;
        }
        Ok(())
    }

    /// Skips whitespace and bracket comments. With the NHX flavor, comment
    /// bodies are collected together with their offsets.
    fn skip_trivia(
        &mut self,
        mut comments: Option<&mut Vec<(usize, &'a str)>>,
    ) -> Result<(), TreeParseError> {
        loop {
            match self.peek() {
                Some(byte) if byte.is_ascii_whitespace() => self.position += 1,
                Some(b'[') => {
                    let text = self.text;
                    let start = self.position;
                    let Some(len) = text[start..].find(']') else {
                        return Err(TreeParseError::UnterminatedComment(start));
                    };
                    if self.flavor == Flavor::Nhx
                        && let Some(comments) = comments.as_deref_mut()
                    {
                        comments.push((start, &text[start + 1..start + len]));
                    }
                    self.position = start + len + 1;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Reads a quoted or unquoted label. Returns `None` when no label is
    /// present.
    fn label(&mut self) -> Result<Option<(String, bool)>, TreeParseError> {
        if self.peek() != Some(b'\'') {
            let (token, _) = self.token();
            return Ok((!token.is_empty()).then(|| (token.to_string(), false)));
        }

        let start = self.position;
        let mut label = String::new();
        self.position += 1;
        loop {
            let Some(len) = self.text[self.position..].find('\'') else {
                return Err(TreeParseError::UnterminatedQuote(start));
            };
            label.push_str(&self.text[self.position..self.position + len]);
            self.position += len + 1;
            if self.peek() == Some(b'\'') {
                label.push('\'');
                self.position += 1;
            } else {
                return Ok(Some((label, true)));
            }
        }
    }

    /// Reads bytes up to the next delimiter.
    fn token(&mut self) -> (&'a str, usize) {
        let text = self.text;
        let start = self.position;
        let bytes = text.as_bytes();
        while self.position < bytes.len() && !is_label_delimiter(bytes[self.position])
        {
            self.position += 1;
        }
        (&text[start..self.position], start)
    }
}

fn apply_comment(
    tree: &mut Tree,
    node_id: NodeId,
    comment: &str,
    offset: usize,
) -> Result<(), TreeParseError> {
    let Some(pairs) = parse_comment(comment) else {
        return Ok(());
    };
    let Some(node) = tree.node_mut(node_id) else {
        return Ok(());
    };
    for (key, value) in pairs {
        match AttributeKind::of(&key) {
            AttributeKind::Support => {
                node.set_support(Some(parse_number(&value, offset)?))
            }
            AttributeKind::Length => {
                node.set_branch_length(Some(parse_number(&value, offset)?))
            }
            AttributeKind::Opaque => node.metadata_mut().insert(key, value),
        }
    }
    Ok(())
}

fn parse_number(token: &str, offset: usize) -> Result<TreeFloat, TreeParseError> {
    match token.parse::<TreeFloat>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TreeParseError::InvalidNumber { token: token.to_string(), offset }),
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Writes the tree as NEWICK, terminated by `;`. Metadata is dropped.
pub fn write_newick(tree: &Tree) -> String { write(tree, Flavor::Plain) }

/// Writes the tree as NEWICK with a `[&key=value,...]` block after each
/// node that carries metadata.
pub fn write_nhx(tree: &Tree) -> String { write(tree, Flavor::Nhx) }

fn write(tree: &Tree, flavor: Flavor) -> String {
    match tree.root_id() {
        Some(root_id) => {
            let mut newick = String::new();
            write_node(tree, root_id, flavor, &mut newick);
            newick.push(';');
            newick
        }
        None => String::new(),
    }
}

fn write_node(tree: &Tree, node_id: NodeId, flavor: Flavor, newick: &mut String) {
    let Some(node) = tree.node(node_id) else {
        return;
    };

    if !node.is_tip() {
        newick.push('(');
        for (i, &child_id) in node.child_ids().iter().enumerate() {
            if i > 0 {
                newick.push(',');
            }
            write_node(tree, child_id, flavor, newick);
        }
        newick.push(')');
    }

    // A clade's support is written in place of its label when it has none;
    // otherwise it only survives as an attribute.
    let label = node.node_label();
    let mut support_attribute: Option<String> = None;
    match (&label, node.support()) {
        (Some(label), support) => {
            newick.push_str(&quote_label(label));
            support_attribute = support.map(|s| s.to_string());
        }
        (None, Some(support)) if !node.is_tip() => {
            newick.push_str(&support.to_string())
        }
        (None, support) => support_attribute = support.map(|s| s.to_string()),
    }

    if let Some(branch_length) = node.branch_length() {
        newick.push_str(&format!(":{branch_length}"));
    }

    if flavor == Flavor::Nhx {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if let Some(support) = &support_attribute {
            pairs.push((SUPPORT_KEYS[0], support));
        }
        pairs.extend(node.metadata().iter());
        newick.push_str(&format_comment(pairs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phylo::ErrorKind;

    #[test]
    fn test_parse_basic() {
        let tree = parse_newick("(A:0.1,(B:0.2,C:0.3)90:0.05):0.0;").unwrap();
        assert_eq!(tree.tip_count(), 3);
        assert_eq!(tree.node_count(), 5);
        let bc = tree.lca_by_labels(&["B", "C"]).unwrap();
        assert_eq!(tree.support(bc), Some(90.0));
        assert_eq!(tree.label(bc), None);
        assert_eq!(tree.branch_length(bc), Some(0.05));
        let root = tree.root_id().unwrap();
        assert_eq!(tree.branch_length(root), Some(0.0));
    }

    #[test]
    fn test_internal_token_is_label_unless_numeric() {
        let tree = parse_newick("((A,B)Clade1,(C,D)'95');").unwrap();
        let ab = tree.node_id_by_label("Clade1").unwrap();
        assert_eq!(tree.support(ab), None);
        let cd = tree.node_id_by_label("95").unwrap();
        assert_eq!(tree.support(cd), None);
    }

    #[test]
    fn test_quoted_labels_and_whitespace() {
        let tree = parse_newick(" ( 'Homo sapiens' : 1 ,\n 'O''Brien':2 ) ; ").unwrap();
        assert!(tree.node_id_by_label("Homo sapiens").is_some());
        assert!(tree.node_id_by_label("O'Brien").is_some());
        assert_eq!(write_newick(&tree), "('Homo sapiens':1,'O''Brien':2);");
    }

    #[test]
    fn test_comments_skipped_in_plain_newick() {
        let tree = parse_newick("[&R] (A[&S=x]:1,B:2[&B=50]);").unwrap();
        let a = tree.node_id_by_label("A").unwrap();
        assert!(tree.node(a).unwrap().metadata().is_empty());
        assert!(!tree.has_support_values());
    }

    #[test]
    fn test_nhx_attributes() {
        let tree =
            parse_nhx("((A:1[&&NHX:S=Human:D=N],B:2)X:3[&B=75,length=4],C:5);")
                .unwrap();
        let a = tree.node_id_by_label("A").unwrap();
        let metadata = tree.node(a).unwrap().metadata();
        assert_eq!(metadata.get("S"), Some("Human"));
        assert_eq!(metadata.get("D"), Some("N"));
        let x = tree.node_id_by_label("X").unwrap();
        assert_eq!(tree.support(x), Some(75.0));
        assert_eq!(tree.branch_length(x), Some(4.0));
        assert_eq!(write_nhx(&tree), "((A:1[&S=Human,D=N],B:2)X:4[&B=75],C:5);");
        assert_eq!(write_newick(&tree), "((A:1,B:2)X:4,C:5);");
    }

    #[test]
    fn test_single_node_and_trailing_text() {
        let tree = parse_newick("A; (B,C);").unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.tip_count(), 1);
        assert_eq!(write_newick(&tree), "A;");
    }

    #[test]
    fn test_unary_and_empty_labels() {
        let tree = parse_newick("((A:1)X:2,);").unwrap();
        assert_eq!(tree.tip_count(), 2);
        assert_eq!(write_newick(&tree), "((A:1)X:2,);");
    }

    #[test]
    fn test_parse_errors() {
        let test_cases = vec![
            ("empty tree", ";", TreeParseError::EmptyInput),
            ("no semicolon", "(A,B)", TreeParseError::MissingTerminator(5)),
            ("unbalanced", "((A,B);", TreeParseError::UnbalancedParenthesis(0)),
            (
                "bad length",
                "(A:x,B);",
                TreeParseError::InvalidNumber { token: "x".to_string(), offset: 3 },
            ),
            (
                "nan length",
                "(A:NaN,B);",
                TreeParseError::InvalidNumber { token: "NaN".to_string(), offset: 3 },
            ),
            (
                "space inside label",
                "(A B,C);",
                TreeParseError::UnexpectedCharacter { character: 'B', offset: 3 },
            ),
            (
                "label after quote",
                "('A'x,C);",
                TreeParseError::UnexpectedCharacter { character: 'x', offset: 4 },
            ),
            (
                "two roots",
                "(A,B),C;",
                TreeParseError::UnexpectedCharacter { character: ',', offset: 5 },
            ),
        ];

        for (name, input, expected) in test_cases {
            println!("Testing: {name}");
            let err = parse_newick(input).unwrap_err();
            assert_eq!(err, expected, "case: {name}");
            assert_eq!(err.kind(), ErrorKind::Format, "case: {name}");
        }
    }

    #[test]
    fn test_nhx_support_must_be_numeric() {
        let err = parse_nhx("(A,B)[&B=high];").unwrap_err();
        assert_eq!(err, TreeParseError::InvalidNumber { token: "high".to_string(), offset: 5 });
    }
}
