//! Render controller
//!
//! Keeps a renderer synchronized with a scene. Every pass evaluates the
//! scene depth first from the root, compares each location with the
//! snapshot stored for it and pushes only what differs. Parents are always
//! edited before their children.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::snapshot::{LocationSnapshot, LocationValues, ProxyValues, Pushed, SyncReport};
use super::{ControllerConfig, ControllerError, ControllerResult};
use crate::foundation::math::Mat4;
use crate::foundation::time::Stopwatch;
use crate::render::{RenderError, Renderer, RendererId};
use crate::scene::{
    inherit_attributes, Attributes, Context, Data, MatchResult, Object, Options, PathMatcher, SceneError,
    ScenePath, SceneSource, LIGHTS_SET_NAME, SETS_ATTRIBUTE, VISIBILITY_ATTRIBUTE,
};

/// What a location hands down to its children
#[derive(Debug, Clone)]
struct Inherited {
    full_transform: Mat4,
    attributes: Attributes,
}

impl Inherited {
    fn root() -> Self {
        Self {
            full_transform: Mat4::identity(),
            attributes: Attributes::new(),
        }
    }

    fn is_hidden(&self) -> bool {
        self.attributes.get(VISIBILITY_ATTRIBUTE).and_then(Data::as_bool) == Some(false)
    }
}

/// State shared by every location of one pass
struct Pass<'a> {
    sets: Vec<(String, PathMatcher)>,
    lights: PathMatcher,
    scope: Option<&'a PathMatcher>,
    report: SyncReport,
}

impl Pass<'_> {
    /// Names of the sets containing `path`
    fn memberships(&self, path: &ScenePath) -> Vec<String> {
        self.sets
            .iter()
            .filter(|(_, paths)| paths.contains(path))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether a child should be visited when its parent is not forcing it
    fn reaches(&self, path: &ScenePath) -> bool {
        self.scope.map_or(true, |scope| {
            scope
                .match_result(path)
                .intersects(MatchResult::EXACT | MatchResult::DESCENDANT)
        })
    }
}

fn evaluation(path: &ScenePath) -> impl FnOnce(SceneError) -> ControllerError + '_ {
    move |source| ControllerError::Evaluation {
        path: path.clone(),
        source,
    }
}

fn rejection(path: &ScenePath) -> impl FnOnce(RenderError) -> ControllerError + '_ {
    move |source| ControllerError::Renderer {
        path: path.clone(),
        source,
    }
}

/// Synchronizes a scene into a renderer
///
/// The controller holds shared references to its scene, context and
/// renderer; nothing is copied on construction. Sync methods take
/// `&mut self`, so a controller is driven from one thread at a time.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use scene_sync::prelude::*;
///
/// let scene = Arc::new(SceneDescription::load("scene.ron")?.build()?);
/// let renderer = Arc::new(CapturingRenderer::default());
/// let mut controller = RenderController::new(scene, Arc::new(Context::new()), renderer);
/// controller.set_minimum_expansion_depth(2);
/// let report = controller.update()?;
/// println!("{} edits", report.edits());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RenderController {
    scene: Arc<dyn SceneSource>,
    context: Arc<Context>,
    renderer: Arc<dyn Renderer>,

    minimum_expansion_depth: usize,
    expanded_paths: PathMatcher,
    root: ScenePath,

    /// Last synchronized state per location
    locations: BTreeMap<ScenePath, LocationSnapshot>,

    /// Options as last pushed
    options: Options,
}

impl RenderController {
    /// Create a controller with the default configuration
    pub fn new(scene: Arc<dyn SceneSource>, context: Arc<Context>, renderer: Arc<dyn Renderer>) -> Self {
        Self::with_config(scene, context, renderer, ControllerConfig::default())
    }

    /// Create a controller from a configuration
    pub fn with_config(
        scene: Arc<dyn SceneSource>,
        context: Arc<Context>,
        renderer: Arc<dyn Renderer>,
        config: ControllerConfig,
    ) -> Self {
        log::debug!(
            "Creating render controller for {} renderer (depth {}, root {})",
            renderer.name(),
            config.minimum_expansion_depth,
            config.root
        );
        Self {
            scene,
            context,
            renderer,
            minimum_expansion_depth: config.minimum_expansion_depth,
            expanded_paths: config.expanded_paths_matcher(),
            root: config.root,
            locations: BTreeMap::new(),
            options: Options::new(),
        }
    }

    /// The renderer edits are sent to
    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// The scene being synchronized
    pub fn scene(&self) -> &Arc<dyn SceneSource> {
        &self.scene
    }

    /// The context the scene is evaluated in
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Replace the scene
    ///
    /// Stored snapshots are compared by value on the next pass, so locations
    /// that are equal in the new scene cost no edits.
    pub fn set_scene(&mut self, scene: Arc<dyn SceneSource>) {
        if Arc::ptr_eq(&self.scene, &scene) {
            return;
        }
        log::debug!("Scene replaced, {} locations to compare on next sync", self.locations.len());
        self.scene = scene;
    }

    /// Replace the evaluation context
    pub fn set_context(&mut self, context: Arc<Context>) {
        if Arc::ptr_eq(&self.context, &context) {
            return;
        }
        log::debug!("Context replaced (frame {})", context.frame());
        self.context = context;
    }

    /// Set the deepest depth at which locations are always expanded
    ///
    /// Applies from the next pass.
    pub fn set_minimum_expansion_depth(&mut self, depth: usize) {
        self.minimum_expansion_depth = depth;
    }

    /// Deepest depth at which locations are always expanded
    pub fn minimum_expansion_depth(&self) -> usize {
        self.minimum_expansion_depth
    }

    /// Set the locations expanded regardless of depth
    pub fn set_expanded_paths(&mut self, paths: PathMatcher) {
        self.expanded_paths = paths;
    }

    /// Locations expanded regardless of depth
    pub fn expanded_paths(&self) -> &PathMatcher {
        &self.expanded_paths
    }

    /// Set the location whose subtree is synchronized
    ///
    /// Items outside the new root are retracted by the next [`Self::update`].
    pub fn set_root(&mut self, root: ScenePath) {
        self.root = root;
    }

    /// Location whose subtree is synchronized
    pub fn root(&self) -> &ScenePath {
        &self.root
    }

    /// Number of locations with stored state
    pub fn tracked_locations(&self) -> usize {
        self.locations.len()
    }

    /// Bring the renderer fully in line with the scene
    pub fn update(&mut self) -> ControllerResult<SyncReport> {
        self.run(None)
    }

    /// Synchronize only the locations `paths` matches exactly
    ///
    /// Ancestors of matched locations are evaluated to compose transforms
    /// and attributes but are neither edited nor recorded. A matched location
    /// whose inherited state changed brings its whole subtree with it.
    pub fn update_matching_paths(&mut self, paths: &PathMatcher) -> ControllerResult<SyncReport> {
        if paths.is_empty() {
            return Ok(SyncReport::default());
        }
        self.run(Some(paths))
    }

    fn run(&mut self, scope: Option<&PathMatcher>) -> ControllerResult<SyncReport> {
        let stopwatch = Stopwatch::start_new();
        let result = self.sync(scope);
        match &result {
            Ok(report) => log::debug!(
                "{} sync of {} took {:.3} ms: {} visited, {} edits",
                if scope.is_some() { "Scoped" } else { "Full" },
                self.root,
                stopwatch.elapsed_secs() * 1000.0,
                report.locations_visited,
                report.edits()
            ),
            Err(error) => log::warn!("Sync of {} aborted: {error}", self.root),
        }
        result
    }

    fn sync(&mut self, scope: Option<&PathMatcher>) -> ControllerResult<SyncReport> {
        let root = self.root.clone();
        if !self.scene.exists(&root, &self.context).map_err(evaluation(&root))? {
            return Err(ControllerError::MissingSceneTarget(root));
        }

        let mut pass = self.begin_pass(&root, scope)?;
        if scope.is_none() {
            self.sync_options(&mut pass.report)?;
            self.retract_outside(&root, &mut pass.report)?;
        }

        match self.inherited_above(&root)? {
            Some(parent) => self.sync_location(&mut pass, &root, &parent, false)?,
            None => self.retract_in_scope(&root, scope, &mut pass.report)?,
        }
        Ok(pass.report)
    }

    fn begin_pass<'a>(&self, root: &ScenePath, scope: Option<&'a PathMatcher>) -> ControllerResult<Pass<'a>> {
        let mut sets = Vec::new();
        let mut names = self.scene.set_names(&self.context).map_err(evaluation(root))?;
        names.sort();
        for name in names {
            let paths = self.scene.set(&name, &self.context).map_err(evaluation(root))?;
            sets.push((name, paths));
        }
        let lights = match sets.iter().find(|(name, _)| name == LIGHTS_SET_NAME) {
            Some((_, paths)) => paths.clone(),
            None => self
                .scene
                .set(LIGHTS_SET_NAME, &self.context)
                .map_err(evaluation(root))?,
        };
        Ok(Pass {
            sets,
            lights,
            scope,
            report: SyncReport::default(),
        })
    }

    fn sync_options(&mut self, report: &mut SyncReport) -> ControllerResult<()> {
        let globals = self.scene.globals(&self.context).map_err(evaluation(&self.root))?;

        let stale: Vec<String> = self
            .options
            .keys()
            .filter(|name| !globals.contains_key(*name))
            .cloned()
            .collect();
        for name in stale {
            if let Err(source) = self.renderer.option(&name, None) {
                return Err(ControllerError::RejectedOption { name, source });
            }
            log::trace!("Reset option {name}");
            self.options.remove(&name);
            report.options_changed += 1;
        }

        for (name, value) in globals {
            if self.options.get(&name) == Some(&value) {
                continue;
            }
            if let Err(source) = self.renderer.option(&name, Some(&value)) {
                return Err(ControllerError::RejectedOption { name, source });
            }
            log::trace!("Set option {name} = {value}");
            self.options.insert(name, value);
            report.options_changed += 1;
        }
        Ok(())
    }

    fn is_expanded(&self, path: &ScenePath) -> bool {
        path.depth() <= self.minimum_expansion_depth || self.expanded_paths.contains(path)
    }

    /// Compose a location's full transform and attributes onto its parent's
    fn compose(&self, path: &ScenePath, parent: &Inherited) -> ControllerResult<Inherited> {
        // The root's own transform is not part of any full transform
        let transform = if path.is_root() {
            Mat4::identity()
        } else {
            self.scene.transform(path, &self.context).map_err(evaluation(path))?
        };
        let local = self.scene.attributes(path, &self.context).map_err(evaluation(path))?;
        Ok(Inherited {
            full_transform: parent.full_transform * transform,
            attributes: inherit_attributes(&parent.attributes, &local),
        })
    }

    /// State inherited from the strict ancestors of `path`, `None` if one is hidden
    fn inherited_above(&self, path: &ScenePath) -> ControllerResult<Option<Inherited>> {
        let mut inherited = Inherited::root();
        for ancestor in path.ancestors() {
            inherited = self.compose(&ancestor, &inherited)?;
            if inherited.is_hidden() {
                return Ok(None);
            }
        }
        Ok(Some(inherited))
    }

    fn sync_location(
        &mut self,
        pass: &mut Pass<'_>,
        path: &ScenePath,
        parent: &Inherited,
        forced: bool,
    ) -> ControllerResult<()> {
        let in_scope = forced || pass.scope.map_or(true, |scope| scope.contains(path));
        let current = self.compose(path, parent)?;

        if current.is_hidden() {
            let scope = if in_scope { None } else { pass.scope };
            return self.retract_in_scope(path, scope, &mut pass.report);
        }
        if !in_scope {
            return self.descend_toward_matches(pass, path, &current);
        }
        pass.report.locations_visited += 1;

        let object = self.scene.object(path, &self.context).map_err(evaluation(path))?;
        let bound = self.scene.bound(path, &self.context).map_err(evaluation(path))?;
        let child_names = self.scene.child_names(path, &self.context).map_err(evaluation(path))?;

        let mut attributes = current.attributes.clone();
        let memberships = pass.memberships(path);
        if !memberships.is_empty() {
            attributes.insert(SETS_ATTRIBUTE.to_string(), Data::StringList(memberships));
        }

        let wanted = if pass.lights.contains(path) {
            Pushed::Light
        } else if object.is_some() {
            Pushed::Object
        } else {
            Pushed::Nothing
        };
        let expanded = self.is_expanded(path);
        let proxy = (!expanded && !child_names.is_empty()).then(|| ProxyValues {
            bound,
            full_transform: current.full_transform,
            attributes: attributes.clone(),
        });
        let values = LocationValues {
            full_transform: current.full_transform,
            bound,
            object,
            attributes,
        };

        // The snapshot leaves the map while it is edited and always goes back
        let mut snapshot = self.locations.remove(path).unwrap_or_else(LocationSnapshot::unsynced);
        let propagate = snapshot.inherited_state_changed(&values) || !snapshot.expanded;
        let result = self
            .sync_item(path, &mut snapshot, values, wanted, &mut pass.report)
            .and_then(|()| self.sync_proxy(path, &mut snapshot, expanded, proxy, &mut pass.report));
        self.locations.insert(path.clone(), snapshot);
        result?;

        if !expanded {
            return Ok(());
        }
        self.retract_vanished_children(path, &child_names, None, &mut pass.report)?;

        let force_children = forced || propagate;
        for name in &child_names {
            let child = path.child(name.as_str());
            if force_children || pass.reaches(&child) {
                self.sync_location(pass, &child, &current, force_children)?;
            }
        }
        Ok(())
    }

    /// Walk through an unmatched ancestor toward the matched locations below it
    fn descend_toward_matches(&mut self, pass: &mut Pass<'_>, path: &ScenePath, current: &Inherited) -> ControllerResult<()> {
        let Some(scope) = pass.scope else {
            return Ok(());
        };
        if !self.is_expanded(path) {
            return Ok(());
        }
        let child_names = self.scene.child_names(path, &self.context).map_err(evaluation(path))?;
        self.retract_vanished_children(path, &child_names, Some(scope), &mut pass.report)?;

        for name in &child_names {
            let child = path.child(name.as_str());
            if pass.reaches(&child) {
                self.sync_location(pass, &child, current, false)?;
            }
        }
        Ok(())
    }

    /// Push, replace or remove the object or light at a location
    fn sync_item(
        &self,
        path: &ScenePath,
        snapshot: &mut LocationSnapshot,
        values: LocationValues,
        wanted: Pushed,
        report: &mut SyncReport,
    ) -> ControllerResult<()> {
        if snapshot.pushed == wanted && snapshot.values.as_ref() == Some(&values) {
            return Ok(());
        }

        let id = RendererId::location(path.clone());
        if snapshot.pushed != wanted && snapshot.pushed != Pushed::Nothing {
            self.renderer.remove(&id).map_err(rejection(path))?;
            log::trace!("Removed {:?} at {id}", snapshot.pushed);
            snapshot.pushed = Pushed::Nothing;
            report.items_removed += 1;
        }

        let replacing = snapshot.pushed == wanted;
        match (wanted, values.object.as_deref()) {
            (Pushed::Light, object) => {
                self.renderer
                    .light(&id, object, &values.full_transform, &values.attributes)
                    .map_err(rejection(path))?;
                if replacing {
                    report.lights_updated += 1;
                } else {
                    report.lights_created += 1;
                }
            }
            (Pushed::Object, Some(object)) => {
                self.renderer
                    .object(&id, object, &values.full_transform, &values.attributes)
                    .map_err(rejection(path))?;
                if replacing {
                    report.objects_updated += 1;
                } else {
                    report.objects_created += 1;
                }
            }
            _ => {}
        }
        if wanted != Pushed::Nothing {
            log::trace!("Pushed {wanted:?} at {id}");
        }

        snapshot.pushed = wanted;
        snapshot.values = Some(values);
        Ok(())
    }

    /// Bring the children proxy of a location in line with its expansion
    fn sync_proxy(
        &mut self,
        path: &ScenePath,
        snapshot: &mut LocationSnapshot,
        expanded: bool,
        proxy: Option<ProxyValues>,
        report: &mut SyncReport,
    ) -> ControllerResult<()> {
        if !expanded {
            self.retract_descendants(path, report)?;
        }
        snapshot.expanded = expanded;

        let id = RendererId::children_proxy(path.clone());
        match proxy {
            Some(proxy) if snapshot.proxy.as_ref() != Some(&proxy) => {
                self.renderer
                    .object(&id, &Object::BoundingBox(proxy.bound), &proxy.full_transform, &proxy.attributes)
                    .map_err(rejection(path))?;
                log::trace!("Pushed proxy {id}");
                snapshot.proxy = Some(proxy);
                report.proxies_pushed += 1;
            }
            Some(_) => {}
            None if snapshot.proxy.is_some() => {
                self.renderer.remove(&id).map_err(rejection(path))?;
                log::trace!("Removed proxy {id}");
                snapshot.proxy = None;
                report.items_removed += 1;
            }
            None => {}
        }
        Ok(())
    }

    /// Stored locations at or beneath `path`, parents first
    fn stored_subtree(&self, path: &ScenePath) -> Vec<ScenePath> {
        self.locations
            .range(path.clone()..)
            .map(|(stored, _)| stored)
            .take_while(|stored| stored.starts_with(path))
            .cloned()
            .collect()
    }

    /// Remove everything pushed for one location and forget it
    fn retract(&mut self, path: &ScenePath, report: &mut SyncReport) -> ControllerResult<()> {
        let Some(snapshot) = self.locations.get_mut(path) else {
            return Ok(());
        };
        if snapshot.pushed != Pushed::Nothing {
            self.renderer
                .remove(&RendererId::location(path.clone()))
                .map_err(rejection(path))?;
            snapshot.pushed = Pushed::Nothing;
            report.items_removed += 1;
        }
        if snapshot.proxy.is_some() {
            self.renderer
                .remove(&RendererId::children_proxy(path.clone()))
                .map_err(rejection(path))?;
            snapshot.proxy = None;
            report.items_removed += 1;
        }
        self.locations.remove(path);
        Ok(())
    }

    /// Retract stored locations under `path`
    ///
    /// Without a scope the whole stored subtree goes; with one, only stored
    /// locations the scope matches exactly or through an ancestor.
    fn retract_in_scope(
        &mut self,
        path: &ScenePath,
        scope: Option<&PathMatcher>,
        report: &mut SyncReport,
    ) -> ControllerResult<()> {
        let doomed: Vec<ScenePath> = self
            .stored_subtree(path)
            .into_iter()
            .filter(|stored| {
                scope.map_or(true, |scope| {
                    scope
                        .match_result(stored)
                        .intersects(MatchResult::EXACT | MatchResult::ANCESTOR)
                })
            })
            .collect();
        if !doomed.is_empty() {
            log::debug!("Retracting {} locations under {path}", doomed.len());
        }
        for stored in &doomed {
            self.retract(stored, report)?;
        }
        Ok(())
    }

    fn retract_descendants(&mut self, path: &ScenePath, report: &mut SyncReport) -> ControllerResult<()> {
        let descendants: Vec<ScenePath> = self
            .stored_subtree(path)
            .into_iter()
            .filter(|stored| stored != path)
            .collect();
        if !descendants.is_empty() {
            log::debug!("Collapsing {path}: retracting {} locations", descendants.len());
        }
        for stored in &descendants {
            self.retract(stored, report)?;
        }
        Ok(())
    }

    /// Retract stored children of `path` that are no longer in the scene
    fn retract_vanished_children(
        &mut self,
        path: &ScenePath,
        child_names: &[String],
        scope: Option<&PathMatcher>,
        report: &mut SyncReport,
    ) -> ControllerResult<()> {
        let depth = path.depth();
        let vanished: BTreeSet<String> = self
            .locations
            .range(path.clone()..)
            .map(|(stored, _)| stored)
            .take_while(|stored| stored.starts_with(path))
            .filter_map(|stored| stored.names().get(depth))
            .filter(|name| !child_names.contains(name))
            .cloned()
            .collect();
        for name in vanished {
            self.retract_in_scope(&path.child(name), scope, report)?;
        }
        Ok(())
    }

    /// Retract stored locations outside `root`
    fn retract_outside(&mut self, root: &ScenePath, report: &mut SyncReport) -> ControllerResult<()> {
        let outside: Vec<ScenePath> = self
            .locations
            .keys()
            .filter(|stored| !stored.starts_with(root))
            .cloned()
            .collect();
        if !outside.is_empty() {
            log::debug!("Retracting {} locations outside {root}", outside.len());
        }
        for stored in &outside {
            self.retract(stored, report)?;
        }
        Ok(())
    }
}
