//! Per-location record of what a controller last pushed
//!
//! This is the controller's cache: for every synchronized location it keeps
//! the values that went to the renderer so the next pass can diff against
//! them structurally.

use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::scene::{Aabb, Attributes, Object};

/// What a location contributed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pushed {
    /// Nothing (no object and not a light)
    Nothing,
    /// A geometric object
    Object,
    /// A light
    Light,
}

/// Values that decide whether a location's item must be re-sent
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationValues {
    /// Transform to world space, ancestors included
    pub full_transform: Mat4,
    /// Bound of the location and its descendants
    pub bound: Aabb,
    /// Object at the location
    pub object: Option<Arc<Object>>,
    /// Inherited attributes plus set memberships, as sent to the renderer
    pub attributes: Attributes,
}

/// Values behind a children proxy
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProxyValues {
    /// Local bound covered by the proxy
    pub bound: Aabb,
    /// Transform to world space
    pub full_transform: Mat4,
    /// Attributes sent with the proxy
    pub attributes: Attributes,
}

/// Controller state for one location
#[derive(Debug, Clone)]
pub(crate) struct LocationSnapshot {
    /// Values last synchronized, `None` until the first successful sync
    pub values: Option<LocationValues>,
    /// What currently exists in the renderer for the location itself
    pub pushed: Pushed,
    /// Proxy currently in the renderer for unexpanded children
    pub proxy: Option<ProxyValues>,
    /// Whether children were instantiated individually
    pub expanded: bool,
}

impl LocationSnapshot {
    /// State of a location nothing has been sent for
    pub fn unsynced() -> Self {
        Self {
            values: None,
            pushed: Pushed::Nothing,
            proxy: None,
            expanded: false,
        }
    }

    /// Whether the full transform or attributes differ from `values`
    ///
    /// These are the values descendants inherit.
    pub fn inherited_state_changed(&self, values: &LocationValues) -> bool {
        self.values.as_ref().map_or(true, |previous| {
            previous.full_transform != values.full_transform || previous.attributes != values.attributes
        })
    }
}

/// Counts of the work done by one synchronization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Locations evaluated and compared
    pub locations_visited: usize,
    /// Geometric objects created
    pub objects_created: usize,
    /// Geometric objects re-sent
    pub objects_updated: usize,
    /// Lights created
    pub lights_created: usize,
    /// Lights re-sent
    pub lights_updated: usize,
    /// Children proxies created or re-sent
    pub proxies_pushed: usize,
    /// Items removed from the renderer
    pub items_removed: usize,
    /// Options set or reset
    pub options_changed: usize,
}

impl SyncReport {
    /// Total renderer edits issued
    pub fn edits(&self) -> usize {
        self.objects_created
            + self.objects_updated
            + self.lights_created
            + self.lights_updated
            + self.proxies_pushed
            + self.items_removed
            + self.options_changed
    }

    /// Whether the pass issued no edits
    pub fn is_noop(&self) -> bool {
        self.edits() == 0
    }
}

impl std::ops::AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.locations_visited += other.locations_visited;
        self.objects_created += other.objects_created;
        self.objects_updated += other.objects_updated;
        self.lights_created += other.lights_created;
        self.lights_updated += other.lights_updated;
        self.proxies_pushed += other.proxies_pushed;
        self.items_removed += other.items_removed;
        self.options_changed += other.options_changed;
    }
}
