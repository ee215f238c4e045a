//! Scene paths
//!
//! A [`ScenePath`] names a location in the scene hierarchy as an ordered list
//! of child names. The ordering is lexicographic by component, which keeps
//! every descendant of a path contiguous directly after it in sorted
//! collections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SceneError;

/// Path to a location in the scene hierarchy
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath {
    names: Vec<String>,
}

impl ScenePath {
    /// The root path `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from its component names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `/`-separated path, ignoring repeated and trailing separators
    pub fn parse(path: &str) -> Result<Self, SceneError> {
        if !path.starts_with('/') {
            return Err(SceneError::InvalidPath(path.to_string()));
        }
        Ok(Self::from_names(path.split('/').filter(|name| !name.is_empty())))
    }

    /// Component names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of components; the root has depth 0
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    /// Final component, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// Path of the named child
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        Self { names }
    }

    /// Whether `self` equals `other` or lies beneath it
    pub fn starts_with(&self, other: &Self) -> bool {
        self.names.starts_with(&other.names)
    }

    /// Whether `self` is strictly beneath `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.depth() > ancestor.depth() && self.starts_with(ancestor)
    }

    /// All strict ancestors from the root downwards
    pub fn ancestors(&self) -> impl Iterator<Item = ScenePath> + '_ {
        (0..self.names.len()).map(move |len| Self {
            names: self.names[..len].to_vec(),
        })
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            return f.write_str("/");
        }
        for name in &self.names {
            write!(f, "/{name}")?;
        }
        Ok(())
    }
}

impl FromStr for ScenePath {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ScenePath {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScenePath> for String {
    fn from(path: ScenePath) -> Self {
        path.to_string()
    }
}
