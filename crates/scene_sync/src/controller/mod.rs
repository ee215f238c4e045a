//! Incremental scene-to-renderer synchronization
//!
//! A [`RenderController`] walks a [`SceneSource`](crate::scene::SceneSource)
//! and issues the minimal set of edits that brings a
//! [`Renderer`](crate::render::Renderer) in line with it. What was pushed for
//! each location is remembered between passes, so an unchanged scene costs
//! evaluation time but no renderer edits.
//!
//! ## Sync pass
//!
//! ```text
//! globals ──► renderer options
//! sets    ──► light classification, "sets" attribute
//! root ─┬─ location: transform, attributes, object, bound ──► object / light
//!       ├─ expanded  ──► recurse into children
//!       └─ collapsed ──► bounding box proxy for the children
//! ```

mod config;
mod render_controller;
mod snapshot;

#[cfg(test)]
mod tests;

pub use config::ControllerConfig;
pub use render_controller::RenderController;
pub use snapshot::SyncReport;

use thiserror::Error;

use crate::render::RenderError;
use crate::scene::{SceneError, ScenePath};

/// Errors that abort a synchronization pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The configured root does not exist in the scene
    #[error("Scene target {0} does not exist")]
    MissingSceneTarget(ScenePath),

    /// The scene failed to evaluate a location
    #[error("Failed to evaluate {path}: {source}")]
    Evaluation {
        /// Location being evaluated
        path: ScenePath,
        /// Underlying scene error
        source: SceneError,
    },

    /// The renderer refused an edit for a location
    #[error("Renderer rejected edit at {path}: {source}")]
    Renderer {
        /// Location being synchronized
        path: ScenePath,
        /// Underlying renderer error
        source: RenderError,
    },

    /// The renderer refused an option
    #[error("Renderer rejected option {name}: {source}")]
    RejectedOption {
        /// Option name
        name: String,
        /// Underlying renderer error
        source: RenderError,
    },
}

impl ControllerError {
    /// Location the error refers to, if any
    pub fn path(&self) -> Option<&ScenePath> {
        match self {
            Self::MissingSceneTarget(path) | Self::Evaluation { path, .. } | Self::Renderer { path, .. } => Some(path),
            Self::RejectedOption { .. } => None,
        }
    }
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;
