use serde::Serialize;
use std::collections::HashSet;

/// A raw URL pulled out of a page. May repeat within one extraction.
pub type CandidateLink = String;

/// Distinct links from one scrape, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    links: Vec<String>,
}

impl LinkSet {
    /// Collapses repeated candidates, keeping the first occurrence of each.
    pub fn dedupe<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = CandidateLink>,
    {
        let mut seen = HashSet::new();
        let links = candidates
            .into_iter()
            .filter(|link| seen.insert(link.clone()))
            .collect();

        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.iter().any(|l| l == link)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.links
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owned(links: &[&str]) -> Vec<String> {
        links.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn repeated_links_appear_once() {
        let set = LinkSet::dedupe(owned(&[
            "https://mega.nz/#abc",
            "https://mediafire.com/xyz",
            "https://mega.nz/#abc",
            "https://mega.nz/#abc",
        ]));

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.into_vec(),
            owned(&["https://mega.nz/#abc", "https://mediafire.com/xyz"])
        );
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let set = LinkSet::dedupe(Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn comparison_is_exact() {
        let set = LinkSet::dedupe(owned(&["https://mega.nz/#abc", "https://MEGA.nz/#abc"]));
        assert_eq!(set.len(), 2);
        assert!(set.contains("https://MEGA.nz/#abc"));
    }
}
