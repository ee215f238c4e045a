//! Declarative scene documents
//!
//! A [`SceneDescription`] is the on-disk form of a [`MemoryScene`], written
//! as TOML or RON:
//!
//! ```text
//! (
//!     children: [
//!         (name: "group", translate: (0.0, 1.0, 0.0), children: [
//!             (name: "sphere", object: Some(Sphere(radius: 1.0))),
//!         ]),
//!     ],
//!     sets: { "__lights": [] },
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use super::{Data, MemoryScene, Object, PathMatcher, SceneNode, ScenePath};
use crate::config::{load_document, ConfigError};
use crate::foundation::math::{Transform, Vec3};

/// One location and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescription {
    /// Child name within the parent
    pub name: String,
    /// Translation
    pub translate: [f32; 3],
    /// Euler rotation in degrees
    pub rotate: [f32; 3],
    /// Scale
    pub scale: [f32; 3],
    /// Translation added per frame
    pub motion: Option<[f32; 3]>,
    /// Object at the location
    pub object: Option<Object>,
    /// Attributes at the location
    pub attributes: BTreeMap<String, Data>,
    /// Child locations
    pub children: Vec<NodeDescription>,
}

impl Default for NodeDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            translate: [0.0; 3],
            rotate: [0.0; 3],
            scale: [1.0; 3],
            motion: None,
            object: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// A complete scene document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Children of the root location
    pub children: Vec<NodeDescription>,
    /// Named sets
    pub sets: BTreeMap<String, Vec<ScenePath>>,
    /// Render options
    pub options: BTreeMap<String, Data>,
}

impl SceneDescription {
    /// Load a description from a `.toml` or `.ron` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_document(path)
    }

    /// Build the in-memory scene the description describes
    pub fn build(&self) -> Result<MemoryScene, ConfigError> {
        let root = build_children(SceneNode::new(), &self.children, &ScenePath::root())?;
        let scene = MemoryScene::from_root(root);
        for (name, paths) in &self.sets {
            scene.set_set(name.clone(), paths.iter().cloned().collect::<PathMatcher>());
        }
        for (name, value) in &self.options {
            scene.set_global(name.clone(), value.clone());
        }
        Ok(scene)
    }
}

fn build_children(
    mut node: SceneNode,
    children: &[NodeDescription],
    path: &ScenePath,
) -> Result<SceneNode, ConfigError> {
    let mut seen = BTreeSet::new();
    for child in children {
        if child.name.is_empty() || child.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "bad child name {:?} under {path}",
                child.name
            )));
        }
        if !seen.insert(child.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate child {:?} under {path}",
                child.name
            )));
        }
        let child_path = path.child(child.name.as_str());
        let built = build_children(child.to_node(), &child.children, &child_path)?;
        node.set_child(child.name.clone(), built);
    }
    Ok(node)
}

impl NodeDescription {
    fn to_node(&self) -> SceneNode {
        let [tx, ty, tz] = self.translate;
        let [rx, ry, rz] = self.rotate;
        let [sx, sy, sz] = self.scale;
        let mut node = SceneNode::new();
        node.transform = Transform::from_components(
            Vec3::new(tx, ty, tz),
            Vec3::new(rx, ry, rz),
            Vec3::new(sx, sy, sz),
        );
        node.motion = self.motion.map(|[x, y, z]| Vec3::new(x, y, z));
        node.object = self.object.clone().map(Arc::new);
        node.attributes = self.attributes.clone();
        node
    }
}
