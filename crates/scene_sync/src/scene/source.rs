//! Scene source trait
//!
//! The contract a controller reads scenes through. Every query is a pure
//! function of (path, context); implementations may cache, but must answer
//! consistently for an unchanged scene.

use std::sync::Arc;
use thiserror::Error;

use super::{Aabb, Attributes, Context, Object, Options, PathMatcher, ScenePath};
use crate::foundation::math::Mat4;

/// Errors reported while evaluating a scene
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The path does not name a location in the scene
    #[error("No such location: {0}")]
    NoSuchLocation(ScenePath),

    /// Computing a value for a location failed
    #[error("Evaluation failed at {path}: {message}")]
    Evaluation {
        /// Location being evaluated
        path: ScenePath,
        /// Description of the failure
        message: String,
    },

    /// A path string could not be parsed
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for scene queries
pub type SceneResult<T> = Result<T, SceneError>;

/// Name of the set classifying locations as lights
pub const LIGHTS_SET_NAME: &str = "__lights";

/// Hierarchical, path-addressed scene description
pub trait SceneSource: Send + Sync {
    /// Bound of the location and all its descendants, in the location's space
    fn bound(&self, path: &ScenePath, context: &Context) -> SceneResult<Aabb>;

    /// Transform relative to the parent location
    fn transform(&self, path: &ScenePath, context: &Context) -> SceneResult<Mat4>;

    /// Object at the location, if any
    fn object(&self, path: &ScenePath, context: &Context) -> SceneResult<Option<Arc<Object>>>;

    /// Attributes assigned at the location, not including inherited ones
    fn attributes(&self, path: &ScenePath, context: &Context) -> SceneResult<Attributes>;

    /// Names of the children of the location, in order
    fn child_names(&self, path: &ScenePath, context: &Context) -> SceneResult<Vec<String>>;

    /// Paths in the named set; unknown sets are empty
    fn set(&self, name: &str, context: &Context) -> SceneResult<PathMatcher>;

    /// Names of all sets defined by the scene
    fn set_names(&self, context: &Context) -> SceneResult<Vec<String>>;

    /// Render options published by the scene
    fn globals(&self, context: &Context) -> SceneResult<Options>;

    /// Whether `path` names a location in the scene
    fn exists(&self, path: &ScenePath, context: &Context) -> SceneResult<bool> {
        let mut current = ScenePath::root();
        for name in path.names() {
            if !self.child_names(&current, context)?.iter().any(|child| child == name) {
                return Ok(false);
            }
            current = current.child(name.as_str());
        }
        Ok(true)
    }

    /// Transform from the location's space to world space
    fn full_transform(&self, path: &ScenePath, context: &Context) -> SceneResult<Mat4> {
        let mut result = Mat4::identity();
        let mut current = ScenePath::root();
        for name in path.names() {
            current = current.child(name.as_str());
            result *= self.transform(&current, context)?;
        }
        Ok(result)
    }
}
