//! # Scene Sync
//!
//! Incremental synchronization of hierarchical scenes into live renderers.
//!
//! ## Features
//!
//! - **Incremental Updates**: Only locations that changed since the last pass produce renderer edits
//! - **Scoped Updates**: Re-synchronize just the paths an editor touched
//! - **Expansion Policy**: Deep subtrees collapse into bounding box proxies
//! - **Light Classification**: Membership of the `__lights` set routes locations to lights
//! - **Declarative Scenes**: Scene documents in TOML or RON
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use scene_sync::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scene = Arc::new(MemoryScene::from_root(
//!         SceneNode::new().with_child("sphere", SceneNode::with_object(Object::Sphere { radius: 1.0 })),
//!     ));
//!     let renderer = Arc::new(CapturingRenderer::default());
//!     let mut controller = RenderController::new(scene, Arc::new(Context::new()), renderer.clone());
//!
//!     controller.set_minimum_expansion_depth(2);
//!     controller.update()?;
//!     assert_eq!(renderer.item_ids().len(), 1);
//!
//!     // Nothing changed, nothing is sent
//!     assert!(controller.update()?.is_noop());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod controller;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        controller::{ControllerConfig, ControllerError, RenderController, SyncReport},
        foundation::{
            math::{Mat4, Transform, Vec3},
            time::Stopwatch,
        },
        render::{CapturingRenderer, RenderError, RenderType, Renderer, RendererId},
        scene::{
            Aabb, Context, Data, MemoryScene, Object, PathMatcher, SceneDescription, SceneError,
            SceneNode, ScenePath, SceneSource,
        },
    };
}
