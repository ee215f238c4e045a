//! Capturing renderer
//!
//! Keeps the current scene state in memory and logs every edit it receives.
//! Answers the same bound queries an interactive viewport renderer does,
//! which makes it the reference sink for tests and statistics.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    CommandArgs, CommandResult, RenderError, RenderResult, RenderType, Renderer, RendererId,
};
use crate::foundation::math::Mat4;
use crate::scene::{Aabb, Attributes, Data, MatchResult, Object, Options, PathMatcher, ScenePath};

/// Option holding the paths `queryBound` restricts itself to
pub const SELECTION_OPTION: &str = "selection";

/// Whether a captured item came from `object` or `light`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Geometry
    Object,
    /// Light
    Light,
}

/// An item held by a [`CapturingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedItem {
    /// How the item was created
    pub kind: ItemKind,
    /// Object description, absent for lights created without one
    pub object: Option<Object>,
    /// World transform
    pub transform: Mat4,
    /// Attributes as received
    pub attributes: Attributes,
}

impl CapturedItem {
    /// Bound of the item in world space
    pub fn world_bound(&self) -> Aabb {
        self.object
            .as_ref()
            .map_or_else(Aabb::empty, |object| object.bound().transformed(&self.transform))
    }
}

/// One edit received by a [`CapturingRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEdit {
    /// `object` call
    Object(RendererId),
    /// `light` call
    Light(RendererId),
    /// `remove` call
    Remove(RendererId),
    /// `option` call
    Option(String),
}

#[derive(Debug, Default)]
struct CaptureState {
    items: BTreeMap<RendererId, CapturedItem>,
    options: Options,
    edits: Vec<RenderEdit>,
    rejected: PathMatcher,
}

/// In-memory renderer recording the edits it receives
#[derive(Debug)]
pub struct CapturingRenderer {
    render_type: RenderType,
    state: Mutex<CaptureState>,
}

impl Default for CapturingRenderer {
    fn default() -> Self {
        Self::new(RenderType::Interactive)
    }
}

impl CapturingRenderer {
    /// Create an empty renderer
    pub fn new(render_type: RenderType) -> Self {
        Self {
            render_type,
            state: Mutex::new(CaptureState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of edits received since creation or the last [`Self::clear_edits`]
    pub fn edit_count(&self) -> usize {
        self.state().edits.len()
    }

    /// Copy of the edit log
    pub fn edits(&self) -> Vec<RenderEdit> {
        self.state().edits.clone()
    }

    /// Empty the edit log, keeping the scene state
    pub fn clear_edits(&self) {
        self.state().edits.clear();
    }

    /// Current item for `id`
    pub fn item(&self, id: &RendererId) -> Option<CapturedItem> {
        self.state().items.get(id).cloned()
    }

    /// Identifiers of all current items, sorted
    pub fn item_ids(&self) -> Vec<RendererId> {
        self.state().items.keys().cloned().collect()
    }

    /// Current value of an option
    pub fn option_value(&self, name: &str) -> Option<Data> {
        self.state().options.get(name).cloned()
    }

    /// Union of the world bounds of current items
    ///
    /// With a selection, only items whose location is in it are included.
    pub fn world_bound(&self, selection: Option<&PathMatcher>) -> Aabb {
        self.state()
            .items
            .iter()
            .filter(|(id, _)| selection.map_or(true, |paths| paths.contains(&id.path)))
            .fold(Aabb::empty(), |bound, (_, item)| bound.union(&item.world_bound()))
    }

    /// Reject edits to items at `path` and its descendants
    pub fn reject_path(&self, path: ScenePath) {
        self.state().rejected.add_path(path);
    }

    fn store(&self, id: &RendererId, item: CapturedItem) -> RenderResult<()> {
        let mut state = self.state();
        let verdict = state.rejected.match_result(&id.path);
        if verdict.intersects(MatchResult::EXACT | MatchResult::ANCESTOR) {
            return Err(RenderError::Rejected {
                id: id.to_string(),
                reason: "path is rejected by this renderer".to_string(),
            });
        }
        let edit = match item.kind {
            ItemKind::Object => RenderEdit::Object(id.clone()),
            ItemKind::Light => RenderEdit::Light(id.clone()),
        };
        log::trace!("capture {edit:?}");
        state.edits.push(edit);
        state.items.insert(id.clone(), item);
        Ok(())
    }

    fn query_bound(&self, args: &CommandArgs) -> RenderResult<CommandResult> {
        let use_selection = match args.get("selection") {
            None => false,
            Some(Data::Bool(value)) => *value,
            Some(other) => {
                return Err(RenderError::InvalidArgument {
                    name: "selection".to_string(),
                    reason: format!("expected Bool, got {other}"),
                })
            }
        };

        if !use_selection {
            return Ok(CommandResult::Bound(self.world_bound(None)));
        }
        let selection = self
            .option_value(SELECTION_OPTION)
            .and_then(|data| data.as_paths().cloned())
            .unwrap_or_default();
        Ok(CommandResult::Bound(self.world_bound(Some(&selection))))
    }

    fn item_count(&self, args: &CommandArgs) -> RenderResult<CommandResult> {
        let kind = match args.get("kind") {
            None => None,
            Some(Data::String(kind)) if kind == "object" => Some(ItemKind::Object),
            Some(Data::String(kind)) if kind == "light" => Some(ItemKind::Light),
            Some(other) => {
                return Err(RenderError::InvalidArgument {
                    name: "kind".to_string(),
                    reason: format!("expected \"object\" or \"light\", got {other}"),
                })
            }
        };
        let count = self
            .state()
            .items
            .values()
            .filter(|item| kind.map_or(true, |kind| item.kind == kind))
            .count();
        Ok(CommandResult::Count(count))
    }
}

impl Renderer for CapturingRenderer {
    fn name(&self) -> &str {
        "Capturing"
    }

    fn render_type(&self) -> RenderType {
        self.render_type
    }

    fn option(&self, name: &str, value: Option<&Data>) -> RenderResult<()> {
        if name == SELECTION_OPTION {
            if let Some(other) = value.filter(|data| data.as_paths().is_none()) {
                return Err(RenderError::InvalidArgument {
                    name: name.to_string(),
                    reason: format!("expected Paths, got {other}"),
                });
            }
        }
        let mut state = self.state();
        match value {
            Some(value) => state.options.insert(name.to_string(), value.clone()),
            None => state.options.remove(name),
        };
        state.edits.push(RenderEdit::Option(name.to_string()));
        Ok(())
    }

    fn object(&self, id: &RendererId, object: &Object, transform: &Mat4, attributes: &Attributes) -> RenderResult<()> {
        self.store(
            id,
            CapturedItem {
                kind: ItemKind::Object,
                object: Some(object.clone()),
                transform: *transform,
                attributes: attributes.clone(),
            },
        )
    }

    fn light(&self, id: &RendererId, object: Option<&Object>, transform: &Mat4, attributes: &Attributes) -> RenderResult<()> {
        self.store(
            id,
            CapturedItem {
                kind: ItemKind::Light,
                object: object.cloned(),
                transform: *transform,
                attributes: attributes.clone(),
            },
        )
    }

    fn remove(&self, id: &RendererId) -> RenderResult<()> {
        let mut state = self.state();
        if state.items.remove(id).is_none() {
            return Err(RenderError::InvalidIdentifier(id.to_string()));
        }
        state.edits.push(RenderEdit::Remove(id.clone()));
        Ok(())
    }

    fn command(&self, name: &str, args: &CommandArgs) -> RenderResult<CommandResult> {
        match name {
            "queryBound" => self.query_bound(args),
            "itemCount" => self.item_count(args),
            _ => Err(RenderError::UnknownCommand(name.to_string())),
        }
    }
}
