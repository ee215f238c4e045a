//! Controller configuration

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::scene::{PathMatcher, ScenePath};

/// Render controller configuration
///
/// Loaded from TOML or RON through [`Config::load_from_file`]:
///
/// ```text
/// minimum_expansion_depth = 2
/// root = "/world"
/// expanded_paths = ["/world/city/block7"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Locations at or above this depth always have their children expanded
    pub minimum_expansion_depth: usize,

    /// Location whose subtree is synchronized
    pub root: ScenePath,

    /// Extra locations whose children are instantiated individually
    pub expanded_paths: Vec<ScenePath>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            minimum_expansion_depth: 0,
            root: ScenePath::root(),
            expanded_paths: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// Expanded paths as a matcher
    pub fn expanded_paths_matcher(&self) -> PathMatcher {
        self.expanded_paths.iter().cloned().collect()
    }
}

impl Config for ControllerConfig {}
