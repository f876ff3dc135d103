//! Tag lookup utility for profiles

use std::collections::BTreeMap;

/// Read-only view over a way's tags
#[derive(Debug, Clone, Copy)]
pub struct TagLookup<'a> {
    tags: &'a BTreeMap<String, String>,
}

impl<'a> TagLookup<'a> {
    pub fn new(tags: &'a BTreeMap<String, String>) -> Self {
        Self { tags }
    }

    /// Get a tag value by key name
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.tags.get(key).map(String::as_str)
    }

    /// True if `key` is present with exactly `value`
    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get_str(key) == Some(value)
    }

    /// True if `key` is present and one of the yes-like values
    pub fn is_yes(&self, key: &str) -> bool {
        matches!(self.get_str(key), Some("yes" | "true" | "1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_str() {
        let t = tags(&[("highway", "motorway"), ("name", "Main Street")]);
        let lookup = TagLookup::new(&t);

        assert_eq!(lookup.get_str("highway"), Some("motorway"));
        assert_eq!(lookup.get_str("name"), Some("Main Street"));
        assert_eq!(lookup.get_str("surface"), None);
    }

    #[test]
    fn test_is_and_is_yes() {
        let t = tags(&[("highway", "motorway"), ("toll", "1")]);
        let lookup = TagLookup::new(&t);

        assert!(lookup.is("highway", "motorway"));
        assert!(!lookup.is("highway", "primary"));
        assert!(lookup.is_yes("toll"));
        assert!(!lookup.is_yes("bridge"));
    }
}
