//! Path matcher - a set of scene paths with hierarchical queries

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Bound;

use super::ScenePath;

bitflags! {
    /// How a path relates to the contents of a [`PathMatcher`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MatchResult: u8 {
        /// The path itself is in the matcher
        const EXACT = 1 << 0;
        /// Some strict descendant of the path is in the matcher
        const DESCENDANT = 1 << 1;
        /// Some strict ancestor of the path is in the matcher
        const ANCESTOR = 1 << 2;
    }
}

/// Set of scene paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMatcher {
    paths: BTreeSet<ScenePath>,
}

impl PathMatcher {
    /// Create an empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, returning `true` if it was not already present
    pub fn add_path(&mut self, path: ScenePath) -> bool {
        self.paths.insert(path)
    }

    /// Remove a path, returning `true` if it was present
    pub fn remove_path(&mut self, path: &ScenePath) -> bool {
        self.paths.remove(path)
    }

    /// Whether the matcher is empty
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of paths held
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Iterate the held paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &ScenePath> {
        self.paths.iter()
    }

    /// Whether `path` itself is held
    pub fn contains(&self, path: &ScenePath) -> bool {
        self.paths.contains(path)
    }

    /// Classify `path` against the held paths
    pub fn match_result(&self, path: &ScenePath) -> MatchResult {
        let mut result = MatchResult::empty();

        if self.paths.contains(path) {
            result |= MatchResult::EXACT;
        }

        // Descendants sort contiguously right after the path itself.
        let has_descendant = self
            .paths
            .range((Bound::Excluded(path), Bound::Unbounded))
            .next()
            .is_some_and(|candidate| candidate.is_descendant_of(path));
        if has_descendant {
            result |= MatchResult::DESCENDANT;
        }

        if path.ancestors().any(|ancestor| self.paths.contains(&ancestor)) {
            result |= MatchResult::ANCESTOR;
        }

        result
    }
}

impl FromIterator<ScenePath> for PathMatcher {
    fn from_iter<T: IntoIterator<Item = ScenePath>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> TryFrom<&[&'a str]> for PathMatcher {
    type Error = super::SceneError;

    fn try_from(paths: &[&'a str]) -> Result<Self, Self::Error> {
        paths.iter().map(|p| ScenePath::parse(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> ScenePath {
        ScenePath::parse(p).unwrap()
    }

    #[test]
    fn test_match_results() {
        let matcher = PathMatcher::try_from(&["/group/sphere"][..]).unwrap();

        assert_eq!(matcher.match_result(&path("/group/sphere")), MatchResult::EXACT);
        assert_eq!(matcher.match_result(&path("/group")), MatchResult::DESCENDANT);
        assert_eq!(matcher.match_result(&path("/")), MatchResult::DESCENDANT);
        assert_eq!(matcher.match_result(&path("/group/sphere/child")), MatchResult::ANCESTOR);
        assert!(matcher.match_result(&path("/group/sphere1")).is_empty());
        assert!(matcher.match_result(&path("/groups")).is_empty());
    }

    #[test]
    fn test_combined_flags() {
        let matcher: PathMatcher = [path("/a"), path("/a/b/c")].into_iter().collect();
        let result = matcher.match_result(&path("/a/b"));
        assert!(result.contains(MatchResult::ANCESTOR | MatchResult::DESCENDANT));
        assert!(!result.contains(MatchResult::EXACT));
    }

    #[test]
    fn test_add_remove() {
        let mut matcher = PathMatcher::new();
        assert!(matcher.add_path(path("/x")));
        assert!(!matcher.add_path(path("/x")));
        assert_eq!(matcher.len(), 1);
        assert!(matcher.remove_path(&path("/x")));
        assert!(matcher.is_empty());
    }
}
