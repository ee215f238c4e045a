//! Renderer abstraction
//!
//! This module defines the edit interface a controller drives. Renderers
//! receive imperative edits (create or update an object or light, remove an
//! item, set an option) and answer commands used for introspection.
//!
//! Edits arrive through `&self` so a renderer can be shared by `Arc`
//! between the controller writing to it and callers querying it;
//! implementations serialize edits internally.

mod capturing;

pub use capturing::{CapturedItem, CapturingRenderer, ItemKind, RenderEdit, SELECTION_OPTION};

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::scene::{Aabb, Attributes, Data, Object, ScenePath};

/// Rendering mode a renderer was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderType {
    /// Scene is sent once and rendered to completion
    Batch,
    /// Scene is edited live while rendering
    Interactive,
}

/// What an item in the renderer stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemRole {
    /// The object or light at a location
    Location,
    /// Bounding box standing in for a location's unexpanded descendants
    ChildrenProxy,
}

/// Identifier of an item in renderer space
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RendererId {
    /// Location the item belongs to
    pub path: ScenePath,
    /// Role of the item at that location
    pub role: ItemRole,
}

impl RendererId {
    /// Identifier for the object or light at `path`
    pub fn location(path: ScenePath) -> Self {
        Self {
            path,
            role: ItemRole::Location,
        }
    }

    /// Identifier for the proxy of `path`'s unexpanded children
    pub fn children_proxy(path: ScenePath) -> Self {
        Self {
            path,
            role: ItemRole::ChildrenProxy,
        }
    }
}

impl fmt::Display for RendererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            ItemRole::Location => write!(f, "{}", self.path),
            ItemRole::ChildrenProxy if self.path.is_root() => f.write_str("/..."),
            ItemRole::ChildrenProxy => write!(f, "{}/...", self.path),
        }
    }
}

/// Named arguments to [`Renderer::command`]
pub type CommandArgs = BTreeMap<String, Data>;

/// Value returned by [`Renderer::command`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Command produced no value
    None,
    /// A bounding box
    Bound(Aabb),
    /// A count of items
    Count(usize),
}

impl CommandResult {
    /// The bound, if the command returned one
    pub fn as_bound(&self) -> Option<Aabb> {
        match self {
            Self::Bound(bound) => Some(*bound),
            _ => None,
        }
    }
}

/// Errors raised by renderers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The identifier does not name an item in the renderer
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The renderer refused an edit
    #[error("Edit rejected for {id}: {reason}")]
    Rejected {
        /// Item being edited
        id: String,
        /// Why the edit was refused
        reason: String,
    },

    /// The command name is not supported
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command or option argument has the wrong type
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Argument or option name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Live renderer accepting scene edits
pub trait Renderer: Send + Sync {
    /// Renderer name, for logs and statistics
    fn name(&self) -> &str;

    /// Mode the renderer was created in
    fn render_type(&self) -> RenderType;

    /// Set an option, or reset it to its default when `value` is `None`
    fn option(&self, name: &str, value: Option<&Data>) -> RenderResult<()>;

    /// Create or replace a geometric object
    fn object(&self, id: &RendererId, object: &Object, transform: &Mat4, attributes: &Attributes) -> RenderResult<()>;

    /// Create or replace a light; `object` is the light's own description
    fn light(&self, id: &RendererId, object: Option<&Object>, transform: &Mat4, attributes: &Attributes) -> RenderResult<()>;

    /// Remove an item previously created with `object` or `light`
    fn remove(&self, id: &RendererId) -> RenderResult<()>;

    /// Run a renderer-specific command
    fn command(&self, name: &str, args: &CommandArgs) -> RenderResult<CommandResult>;
}
