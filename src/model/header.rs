//! Ordered header storage.
//!
//! Header order and duplication are part of message identity: entries are
//! kept exactly in discovery order and duplicates are never merged.

/// One header, as discovered in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Header name with its original spelling (matching is case-insensitive).
    pub name: String,

    /// Unfolded raw value: continuation lines joined with a single space.
    /// Encoded-words are NOT decoded; that is the caller's concern.
    pub value: String,

    /// Byte offset of the entry's first physical line in the source.
    pub offset: u64,
}

/// Ordered sequence of headers with duplicate retention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<HeaderEntry>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, preserving discovery order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>, offset: u64) {
        self.entries.push(HeaderEntry {
            name: name.into(),
            value: value.into(),
            offset,
        });
    }

    /// First value for `name` (ASCII case-insensitive), if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
    }

    /// All entries for `name` (ASCII case-insensitive), in source order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderEntry> {
        self.entries
            .iter()
            .filter(move |e| e.name.eq_ignore_ascii_case(name))
    }

    /// All entries in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, HeaderEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderEntry;
    type IntoIter = std::slice::Iter<'a, HeaderEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_duplicates_preserved() {
        let mut headers = HeaderList::new();
        headers.push("A", "1", 0);
        headers.push("A", "2", 5);
        headers.push("B", "x", 10);

        assert_eq!(headers.len(), 3);
        let names: Vec<&str> = headers.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "A", "B"]);
        assert_eq!(headers.get("a"), Some("1"));
        assert_eq!(headers.get_all("A").count(), 2);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut headers = HeaderList::new();
        headers.push("Content-Type", "text/plain", 0);
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.get("Subject"), None);
    }
}
