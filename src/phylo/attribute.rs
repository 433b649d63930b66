use std::fmt::Display;

// =============================================================================
// Recognised keys
// =============================================================================

/// Comment-block keys whose value is taken as the branch support.
pub const SUPPORT_KEYS: [&str; 4] = ["B", "bootstrap", "support", "posterior"];

/// Comment-block keys whose value overrides the branch length.
pub const LENGTH_KEYS: [&str; 2] = ["length", "branch_length"];

/// What a comment-block key means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Support,
    Length,
    Opaque,
}

impl AttributeKind {
    pub fn of(key: &str) -> Self {
        if SUPPORT_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
            AttributeKind::Support
        } else if LENGTH_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
            AttributeKind::Length
        } else {
            AttributeKind::Opaque
        }
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Unrecognised `key=value` pairs carried by a node.
///
/// Values are kept verbatim and in input order so that they are written back
/// exactly as read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Inserts or replaces a value. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items: Vec<String> =
            self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", items.join(","))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_kind() {
        assert_eq!(AttributeKind::of("B"), AttributeKind::Support);
        assert_eq!(AttributeKind::of("posterior"), AttributeKind::Support);
        assert_eq!(AttributeKind::of("Bootstrap"), AttributeKind::Support);
        assert_eq!(AttributeKind::of("length"), AttributeKind::Length);
        assert_eq!(AttributeKind::of("S"), AttributeKind::Opaque);
    }

    #[test]
    fn test_metadata_keeps_order_and_replaces_in_place() {
        let mut metadata: Metadata =
            [("S", "Human"), ("D", "N"), ("E", "1.1.1")].into_iter().collect();
        metadata.insert("D", "Y");
        assert_eq!(metadata.to_string(), "S=Human,D=Y,E=1.1.1");
        assert_eq!(metadata.remove("S"), Some("Human".to_string()));
        assert_eq!(metadata.get("E"), Some("1.1.1"));
        assert_eq!(metadata.len(), 2);
    }
}
