//! In-memory scene source
//!
//! A mutable tree of [`SceneNode`]s that implements [`SceneSource`]. The tree
//! lives behind a lock so it can be edited while a controller holds the
//! scene through an `Arc`.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    Aabb, Attributes, Context, Data, Object, Options, PathMatcher, SceneError, SceneResult,
    ScenePath, SceneSource,
};
use crate::foundation::math::{Mat4, Transform, Vec3};

/// A location in a [`MemoryScene`]
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    /// Transform relative to the parent
    pub transform: Transform,
    /// Translation added per frame on top of `transform`
    pub motion: Option<Vec3>,
    /// Object at this location
    pub object: Option<Arc<Object>>,
    /// Attributes assigned at this location
    pub attributes: Attributes,
    children: Vec<(String, SceneNode)>,
}

impl SceneNode {
    /// Empty node with identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Node holding an object
    pub fn with_object(object: Object) -> Self {
        Self {
            object: Some(Arc::new(object)),
            ..Self::default()
        }
    }

    /// Builder-style transform assignment
    #[must_use]
    pub fn transformed(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style attribute assignment
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style child insertion
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, child: SceneNode) -> Self {
        self.set_child(name, child);
        self
    }

    /// Insert or replace a child, keeping the position of a replaced child
    pub fn set_child(&mut self, name: impl Into<String>, child: SceneNode) {
        let name = name.into();
        match self.children.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = child,
            None => self.children.push((name, child)),
        }
    }

    /// Remove a child by name
    pub fn remove_child(&mut self, name: &str) -> Option<SceneNode> {
        let index = self.children.iter().position(|(existing, _)| existing == name)?;
        Some(self.children.remove(index).1)
    }

    /// Child by name
    pub fn child(&self, name: &str) -> Option<&SceneNode> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Mutable child by name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.children.iter_mut().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Child names in order
    pub fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Local matrix at the given frame
    pub fn matrix_at(&self, frame: f32) -> Mat4 {
        match self.motion {
            Some(velocity) => {
                let mut transform = self.transform.clone();
                transform.position += velocity * frame;
                transform.to_matrix()
            }
            None => self.transform.to_matrix(),
        }
    }

    /// Bound of this node and its descendants in its own space
    fn bound_at(&self, frame: f32) -> Aabb {
        let own = self.object.as_ref().map_or_else(Aabb::empty, |object| object.bound());
        self.children.iter().fold(own, |bound, (_, child)| {
            bound.union(&child.bound_at(frame).transformed(&child.matrix_at(frame)))
        })
    }
}

#[derive(Debug, Default)]
struct SceneData {
    root: SceneNode,
    sets: BTreeMap<String, PathMatcher>,
    globals: Options,
    failures: PathMatcher,
}

impl SceneData {
    fn node(&self, path: &ScenePath) -> SceneResult<&SceneNode> {
        if self.failures.contains(path) {
            return Err(SceneError::Evaluation {
                path: path.clone(),
                message: "injected failure".to_string(),
            });
        }
        let mut node = &self.root;
        for name in path.names() {
            node = node
                .child(name)
                .ok_or_else(|| SceneError::NoSuchLocation(path.clone()))?;
        }
        Ok(node)
    }

    fn node_mut(&mut self, path: &ScenePath) -> SceneResult<&mut SceneNode> {
        let mut node = &mut self.root;
        for name in path.names() {
            node = node
                .child_mut(name)
                .ok_or_else(|| SceneError::NoSuchLocation(path.clone()))?;
        }
        Ok(node)
    }
}

/// Editable in-memory scene
#[derive(Debug, Default)]
pub struct MemoryScene {
    data: RwLock<SceneData>,
}

impl MemoryScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene from a root node
    pub fn from_root(root: SceneNode) -> Self {
        Self {
            data: RwLock::new(SceneData {
                root,
                ..SceneData::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SceneData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SceneData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `node` as child `name` of `parent`, replacing any existing child
    pub fn insert(&self, parent: &ScenePath, name: &str, node: SceneNode) -> SceneResult<()> {
        self.write().node_mut(parent)?.set_child(name, node);
        Ok(())
    }

    /// Remove the location at `path` and its descendants
    pub fn remove(&self, path: &ScenePath) -> SceneResult<SceneNode> {
        let (Some(parent), Some(name)) = (path.parent(), path.name()) else {
            return Err(SceneError::InvalidPath(path.to_string()));
        };
        self.write()
            .node_mut(&parent)?
            .remove_child(name)
            .ok_or_else(|| SceneError::NoSuchLocation(path.clone()))
    }

    /// Edit the node at `path` in place
    pub fn edit_node<R>(&self, path: &ScenePath, edit: impl FnOnce(&mut SceneNode) -> R) -> SceneResult<R> {
        let mut data = self.write();
        Ok(edit(data.node_mut(path)?))
    }

    /// Define or replace a set
    pub fn set_set(&self, name: impl Into<String>, paths: PathMatcher) {
        self.write().sets.insert(name.into(), paths);
    }

    /// Delete a set
    pub fn remove_set(&self, name: &str) -> Option<PathMatcher> {
        self.write().sets.remove(name)
    }

    /// Publish a render option
    pub fn set_global(&self, name: impl Into<String>, value: Data) {
        self.write().globals.insert(name.into(), value);
    }

    /// Withdraw a render option
    pub fn remove_global(&self, name: &str) -> Option<Data> {
        self.write().globals.remove(name)
    }

    /// Make every query for `path` fail until [`MemoryScene::clear_failures`]
    pub fn fail_at(&self, path: ScenePath) {
        self.write().failures.add_path(path);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.write().failures = PathMatcher::new();
    }
}

impl SceneSource for MemoryScene {
    fn bound(&self, path: &ScenePath, context: &Context) -> SceneResult<Aabb> {
        Ok(self.read().node(path)?.bound_at(context.frame()))
    }

    fn transform(&self, path: &ScenePath, context: &Context) -> SceneResult<Mat4> {
        Ok(self.read().node(path)?.matrix_at(context.frame()))
    }

    fn object(&self, path: &ScenePath, _context: &Context) -> SceneResult<Option<Arc<Object>>> {
        Ok(self.read().node(path)?.object.clone())
    }

    fn attributes(&self, path: &ScenePath, context: &Context) -> SceneResult<Attributes> {
        let mut attributes = self.read().node(path)?.attributes.clone();
        for value in attributes.values_mut() {
            if let Data::String(text) = value {
                *text = context.substitute(text);
            }
        }
        Ok(attributes)
    }

    fn child_names(&self, path: &ScenePath, _context: &Context) -> SceneResult<Vec<String>> {
        Ok(self.read().node(path)?.child_names())
    }

    fn set(&self, name: &str, _context: &Context) -> SceneResult<PathMatcher> {
        Ok(self.read().sets.get(name).cloned().unwrap_or_default())
    }

    fn set_names(&self, _context: &Context) -> SceneResult<Vec<String>> {
        Ok(self.read().sets.keys().cloned().collect())
    }

    fn globals(&self, _context: &Context) -> SceneResult<Options> {
        Ok(self.read().globals.clone())
    }
}
