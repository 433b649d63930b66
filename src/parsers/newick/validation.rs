use crate::parsers::TreeParseError;

/// Pre-validates a NEWICK formatted string.
///
/// Checks that parentheses, quotes and bracket comments are balanced up to
/// the first `;` found outside quotes and comments, and returns the byte
/// offset of that `;`. Text after it is not inspected.
pub(crate) fn validate_newick_structure(s: &str) -> Result<usize, TreeParseError> {
    if s.trim().is_empty() {
        return Err(TreeParseError::EmptyInput);
    }

    let mut open_parens: Vec<usize> = Vec::new();
    let mut quote_start: Option<usize> = None;
    let mut comment_start: Option<usize> = None;

    for (offset, byte) in s.bytes().enumerate() {
        if quote_start.is_some() {
            if byte == b'\'' {
                quote_start = None;
            }
            continue;
        }
        if comment_start.is_some() {
            if byte == b']' {
                comment_start = None;
            }
            continue;
        }
        match byte {
            b'\'' => quote_start = Some(offset),
            b'[' => comment_start = Some(offset),
            b']' => {
                return Err(TreeParseError::UnexpectedCharacter {
                    character: ']',
                    offset,
                });
            }
            b'(' => open_parens.push(offset),
            b')' => {
                if open_parens.pop().is_none() {
                    return Err(TreeParseError::UnbalancedParenthesis(offset));
                }
            }
            b';' => {
                return match open_parens.first() {
                    Some(&unclosed) => {
                        Err(TreeParseError::UnbalancedParenthesis(unclosed))
                    }
                    None => Ok(offset),
                };
            }
            _ => {}
        }
    }

    if let Some(offset) = quote_start {
        return Err(TreeParseError::UnterminatedQuote(offset));
    }
    if let Some(offset) = comment_start {
        return Err(TreeParseError::UnterminatedComment(offset));
    }
    if let Some(&unclosed) = open_parens.first() {
        return Err(TreeParseError::UnbalancedParenthesis(unclosed));
    }
    Err(TreeParseError::MissingTerminator(s.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_newick_structure() {
        let test_cases = vec![
            ("simple", "(A,B);", Ok(5)),
            ("trailing text", "(A,B); junk (", Ok(5)),
            ("semicolon in quotes", "('A;B',C);", Ok(9)),
            ("semicolon in comment", "(A[x;y],B);", Ok(10)),
            ("empty", "  \n", Err(TreeParseError::EmptyInput)),
            ("no terminator", "(A,B)", Err(TreeParseError::MissingTerminator(5))),
            ("unclosed", "((A,B);", Err(TreeParseError::UnbalancedParenthesis(0))),
            ("extra close", "(A,B));", Err(TreeParseError::UnbalancedParenthesis(5))),
            ("open quote", "('A,B);", Err(TreeParseError::UnterminatedQuote(1))),
            ("open comment", "(A[&x=1,B);", Err(TreeParseError::UnterminatedComment(2))),
        ];

        for (name, input, expected) in test_cases {
            println!("Testing: {name}");
            assert_eq!(validate_newick_structure(input), expected, "case: {name}");
        }
    }
}
