/// Checks if a comment body is in NHX format and extracts the content.
pub(super) fn extract_nhx_content(s: &str) -> Option<&str> {
    s.strip_prefix("&&NHX:")
        .or_else(|| s.strip_prefix("&NHX:"))
        .or_else(|| s.strip_prefix("&&NHX"))
        .or_else(|| s.strip_prefix("&NHX"))
}

/// Splits the body of a bracket comment into `key=value` pairs.
///
/// Accepts `&key=value,...` and NHX `&&NHX:key=value:...`. Any other
/// comment is not an attribute block and yields `None`. A key without `=`
/// is kept with an empty value.
pub(crate) fn parse_comment(content: &str) -> Option<Vec<(String, String)>> {
    let (body, delimiter) = match extract_nhx_content(content) {
        Some(nhx) => (nhx, ':'),
        None => (content.strip_prefix('&')?, ','),
    };

    let pairs = split_respecting_brackets(body, delimiter)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let part = part.strip_prefix('&').unwrap_or(part);
            match part.split_once('=') {
                Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                None => (part.to_string(), String::new()),
            }
        })
        .collect();
    Some(pairs)
}

/// Writes pairs back as a single `[&key=value,...]` block.
pub(crate) fn format_comment<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let items: Vec<String> = pairs
        .into_iter()
        .map(|(k, v)| match v {
            "" => k.to_string(),
            v => format!("{k}={v}"),
        })
        .collect();
    match items.is_empty() {
        true => String::new(),
        false => format!("[&{}]", items.join(",")),
    }
}

/// Splits string at delimiter while respecting nested structures.
///
/// Delimiters inside brackets `[]`, parentheses `()`, braces `{}`, or quotes
/// are not split on; attribute values such as `{0.1,0.5}` stay whole.
pub(crate) fn split_respecting_brackets(s: &str, delimiter: char) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (char_index, character) in s.char_indices() {
        match (quote, character) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(character),
            (None, '[' | '(' | '{') => depth += 1,
            (None, ']' | ')' | '}') => depth -= 1,
            (None, c) if c == delimiter && depth == 0 => {
                result.push(&s[start..char_index]);
                start = char_index + c.len_utf8();
            }
            _ => {}
        }
    }

    result.push(&s[start..]);
    result
}

/// Characters that end an unquoted label.
pub(crate) fn is_label_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace()
        || matches!(byte, b'(' | b')' | b'[' | b']' | b'\'' | b':' | b';' | b',')
}

/// Quotes a label for output when it could not be read back unquoted.
pub(crate) fn quote_label(label: &str) -> String {
    if !label.is_empty() && !label.bytes().any(is_label_delimiter) {
        label.to_string()
    } else {
        format!("'{}'", label.replace('\'', "''"))
    }
}
