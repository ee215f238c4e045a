//! Scene description layer
//!
//! Everything a controller reads: paths and path sets, bounds, objects,
//! attribute values, the evaluation context and the [`SceneSource`] trait.
//!
//! ## Architecture
//!
//! ```text
//! SceneDescription (TOML / RON)
//!      ↓
//! MemoryScene (SceneSource)
//!      ↓
//! RenderController
//! ```

mod bound;
mod context;
mod data;
mod description;
mod memory_scene;
mod object;
mod path;
mod path_matcher;
mod source;

pub use bound::Aabb;
pub use context::Context;
pub use data::{inherit_attributes, Attributes, Data, Options};
pub use description::{NodeDescription, SceneDescription};
pub use memory_scene::{MemoryScene, SceneNode};
pub use object::{LightKind, Object};
pub use path::ScenePath;
pub use path_matcher::{MatchResult, PathMatcher};
pub use source::{SceneError, SceneResult, SceneSource, LIGHTS_SET_NAME};

/// Attribute that hides a location and its descendants when `false`
pub const VISIBILITY_ATTRIBUTE: &str = "scene:visible";

/// Attribute through which set membership is forwarded to renderers
pub const SETS_ATTRIBUTE: &str = "sets";
