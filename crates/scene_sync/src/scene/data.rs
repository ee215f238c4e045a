//! Typed values for attributes, options and command arguments

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::PathMatcher;

/// A typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// 3D vector or colour
    V3f([f32; 3]),
    /// List of strings
    StringList(Vec<String>),
    /// Set of scene paths
    Paths(PathMatcher),
}

impl Data {
    /// The boolean value, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The path set, if this is `Paths`
    pub fn as_paths(&self) -> Option<&PathMatcher> {
        match self {
            Self::Paths(paths) => Some(paths),
            _ => None,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::V3f([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Self::StringList(values) => write!(f, "[{}]", values.join(", ")),
            Self::Paths(paths) => {
                let paths: Vec<String> = paths.paths().map(ToString::to_string).collect();
                write!(f, "[{}]", paths.join(", "))
            }
        }
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PathMatcher> for Data {
    fn from(value: PathMatcher) -> Self {
        Self::Paths(value)
    }
}

/// Named values attached to a location, ordered by name
pub type Attributes = BTreeMap<String, Data>;

/// Named render options published by a scene
pub type Options = BTreeMap<String, Data>;

/// Merge `local` attributes over `inherited` ones
pub fn inherit_attributes(inherited: &Attributes, local: &Attributes) -> Attributes {
    let mut merged = inherited.clone();
    merged.extend(local.iter().map(|(name, value)| (name.clone(), value.clone())));
    merged
}
