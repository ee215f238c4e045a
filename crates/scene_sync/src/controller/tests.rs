//! Controller behaviour against a capturing renderer

use std::sync::Arc;

use approx::assert_relative_eq;

use super::{ControllerConfig, ControllerError, RenderController};
use crate::config::Config;
use crate::foundation::logging;
use crate::foundation::math::{Transform, Vec3};
use crate::render::{
    CommandArgs, CapturingRenderer, ItemKind, RenderEdit, Renderer, RendererId, SELECTION_OPTION,
};
use crate::scene::{
    Aabb, Context, Data, MemoryScene, Object, PathMatcher, SceneNode, ScenePath, SceneSource,
    LIGHTS_SET_NAME, SETS_ATTRIBUTE, VISIBILITY_ATTRIBUTE,
};

fn p(path: &str) -> ScenePath {
    ScenePath::parse(path).unwrap()
}

fn matcher(paths: &[&str]) -> PathMatcher {
    paths.iter().map(|path| p(path)).collect()
}

fn sphere() -> SceneNode {
    SceneNode::with_object(Object::Sphere { radius: 1.0 })
}

/// `/group` holding two unit spheres at the origin
fn sphere_group() -> Arc<MemoryScene> {
    let group = SceneNode::new().with_child("sphere", sphere()).with_child("sphere1", sphere());
    Arc::new(MemoryScene::from_root(SceneNode::new().with_child("group", group)))
}

fn single_sphere() -> Arc<MemoryScene> {
    Arc::new(MemoryScene::from_root(SceneNode::new().with_child("sphere", sphere())))
}

/// `/a/b/c/d`, a cube at every level
fn chain() -> Arc<MemoryScene> {
    let cube = || SceneNode::with_object(Object::Cube { size: [1.0; 3] });
    let c = cube().with_child("d", cube());
    let b = cube().with_child("c", c);
    let a = cube().with_child("b", b);
    Arc::new(MemoryScene::from_root(SceneNode::new().with_child("a", a)))
}

fn setup(scene: &Arc<MemoryScene>) -> (Arc<CapturingRenderer>, RenderController) {
    logging::init_for_tests();
    let renderer = Arc::new(CapturingRenderer::default());
    let controller = RenderController::new(scene.clone(), Arc::new(Context::new()), renderer.clone());
    (renderer, controller)
}

fn ids(renderer: &CapturingRenderer) -> Vec<String> {
    renderer.item_ids().iter().map(ToString::to_string).collect()
}

fn total_bound(renderer: &CapturingRenderer) -> Aabb {
    renderer
        .command("queryBound", &CommandArgs::new())
        .unwrap()
        .as_bound()
        .unwrap()
}

fn selected_bound(renderer: &CapturingRenderer, path: &str) -> Aabb {
    renderer
        .option(SELECTION_OPTION, Some(&Data::Paths(matcher(&[path]))))
        .unwrap();
    let args = CommandArgs::from([("selection".to_string(), Data::Bool(true))]);
    renderer.command("queryBound", &args).unwrap().as_bound().unwrap()
}

/// Bound of `path` in world space according to the scene
fn world_bound(scene: &MemoryScene, path: &str) -> Aabb {
    let context = Context::new();
    let path = p(path);
    scene
        .bound(&path, &context)
        .unwrap()
        .transformed(&scene.full_transform(&path, &context).unwrap())
}

fn assert_bound_eq(actual: Aabb, expected: Aabb) {
    assert_relative_eq!(actual.min, expected.min, epsilon = 1e-5);
    assert_relative_eq!(actual.max, expected.max, epsilon = 1e-5);
}

#[test]
fn test_constructor_and_accessors() {
    let scene: Arc<dyn SceneSource> = single_sphere();
    let context1 = Arc::new(Context::new());
    let renderer: Arc<dyn Renderer> = Arc::new(CapturingRenderer::default());
    let mut controller = RenderController::new(scene.clone(), context1.clone(), renderer.clone());

    assert!(Arc::ptr_eq(controller.renderer(), &renderer));
    assert!(Arc::ptr_eq(controller.scene(), &scene));
    assert!(Arc::ptr_eq(controller.context(), &context1));

    let cube: Arc<dyn SceneSource> = Arc::new(MemoryScene::from_root(
        SceneNode::new().with_child("cube", SceneNode::with_object(Object::Cube { size: [1.0; 3] })),
    ));
    let context2 = Arc::new(Context::at_frame(2.0));
    controller.set_scene(cube.clone());
    controller.set_context(context2.clone());

    assert!(Arc::ptr_eq(controller.scene(), &cube));
    assert!(Arc::ptr_eq(controller.context(), &context2));
    assert_eq!(controller.minimum_expansion_depth(), 0);
    assert!(controller.root().is_root());
}

#[test]
fn test_bound_update() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);

    // The root is always expanded, so depth 0 collapses the children of `/group`
    controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/group/..."]);
    assert_bound_eq(total_bound(&renderer), world_bound(&scene, "/"));

    scene
        .edit_node(&p("/group/sphere"), |node| {
            node.transform = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        })
        .unwrap();
    let report = controller.update().unwrap();
    assert_eq!(report.proxies_pushed, 1);
    assert_bound_eq(total_bound(&renderer), world_bound(&scene, "/"));
}

#[test]
fn test_second_update_is_idempotent() {
    let scene = sphere_group();
    scene.set_set("hero", matcher(&["/group/sphere"]));
    scene.set_global("render:camera", Data::from("/cameras/main"));
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);

    let first = controller.update().unwrap();
    assert_eq!(first.objects_created, 2);
    assert_eq!(first.options_changed, 1);
    let edits = renderer.edit_count();

    let second = controller.update().unwrap();
    assert!(second.is_noop());
    assert_eq!(second.locations_visited, first.locations_visited);
    assert_eq!(renderer.edit_count(), edits);
}

#[test]
fn test_update_matching_paths() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    let bound_orig = Object::Sphere { radius: 1.0 }.bound();
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), bound_orig);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), bound_orig);

    for path in ["/group/sphere", "/group/sphere1"] {
        scene
            .edit_node(&p(path), |node| node.object = Some(Arc::new(Object::Sphere { radius: 2.0 })))
            .unwrap();
    }
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), bound_orig);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), bound_orig);

    let report = controller.update_matching_paths(&matcher(&["/group/sphere"])).unwrap();
    assert_eq!(report.locations_visited, 1);
    assert_eq!(report.objects_updated, 1);

    let bound_updated = Object::Sphere { radius: 2.0 }.bound();
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), bound_updated);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), bound_orig);

    let report = controller.update().unwrap();
    assert_eq!(report.objects_updated, 1);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), bound_updated);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), bound_updated);
}

#[test]
fn test_update_matching_paths_and_inherited_transforms() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    let untranslated = world_bound(&scene, "/group/sphere");
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), untranslated);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), untranslated);

    scene
        .edit_node(&p("/group"), |node| {
            node.transform = Transform::from_translation(Vec3::new(2.0, 0.0, 0.0));
        })
        .unwrap();
    let translated = world_bound(&scene, "/group/sphere");
    assert_relative_eq!(translated.min.x, untranslated.min.x + 2.0, epsilon = 1e-5);

    controller.update_matching_paths(&matcher(&["/group/sphere"])).unwrap();
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), translated);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), untranslated);

    controller.update().unwrap();
    assert_bound_eq(selected_bound(&renderer, "/group/sphere"), translated);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), translated);
}

#[test]
fn test_matched_group_carries_its_subtree() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    scene
        .edit_node(&p("/group"), |node| {
            node.transform = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));
        })
        .unwrap();
    let report = controller.update_matching_paths(&matcher(&["/group"])).unwrap();

    assert_eq!(report.objects_updated, 2);
    assert_bound_eq(selected_bound(&renderer, "/group/sphere1"), world_bound(&scene, "/group/sphere1"));
    assert!(controller.update().unwrap().is_noop());
}

#[test]
fn test_empty_matcher_does_nothing() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);

    let report = controller.update_matching_paths(&PathMatcher::new()).unwrap();
    assert!(report.is_noop());
    assert_eq!(renderer.edit_count(), 0);
    assert_eq!(controller.tracked_locations(), 0);
}

#[test]
fn test_update_remove_from_light_set() {
    let sphere_scene = single_sphere();
    let light_scene = single_sphere();
    light_scene.set_set(LIGHTS_SET_NAME, matcher(&["/sphere"]));

    let (renderer, mut controller) = setup(&sphere_scene);
    controller.update().unwrap();
    assert_bound_eq(total_bound(&renderer), world_bound(&light_scene, "/"));

    controller.set_scene(light_scene.clone());
    controller.update().unwrap();
    assert_bound_eq(total_bound(&renderer), world_bound(&light_scene, "/"));

    // Geometry previously sent as a light must render again
    controller.set_scene(sphere_scene);
    controller.update().unwrap();
    assert_bound_eq(total_bound(&renderer), world_bound(&light_scene, "/"));
}

#[test]
fn test_light_reclassification() {
    let sphere_scene = single_sphere();
    let light_scene = single_sphere();
    light_scene.set_set(LIGHTS_SET_NAME, matcher(&["/sphere"]));
    let id = RendererId::location(p("/sphere"));

    let (renderer, mut controller) = setup(&sphere_scene);
    controller.set_minimum_expansion_depth(2);
    controller.update().unwrap();
    assert_eq!(renderer.item(&id).unwrap().kind, ItemKind::Object);

    renderer.clear_edits();
    controller.set_scene(light_scene);
    let report = controller.update().unwrap();
    assert_eq!(renderer.edits(), [RenderEdit::Remove(id.clone()), RenderEdit::Light(id.clone())]);
    assert_eq!(report.lights_created, 1);
    assert_eq!(report.items_removed, 1);
    assert_eq!(renderer.item(&id).unwrap().kind, ItemKind::Light);

    renderer.clear_edits();
    controller.set_scene(sphere_scene);
    controller.update().unwrap();
    assert_eq!(renderer.edits(), [RenderEdit::Remove(id.clone()), RenderEdit::Object(id.clone())]);
    assert_eq!(renderer.item(&id).unwrap().kind, ItemKind::Object);
}

#[test]
fn test_expansion_depth_boundary() {
    let scene = chain();
    let (renderer, mut controller) = setup(&scene);

    controller.set_minimum_expansion_depth(2);
    assert_eq!(renderer.edit_count(), 0);
    controller.update().unwrap();
    // `/a/b` sits exactly at the threshold and has its children instantiated
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/c", "/a/b/c/..."]);
    assert_bound_eq(total_bound(&renderer), world_bound(&scene, "/"));

    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/c", "/a/b/c/d"]);

    controller.set_minimum_expansion_depth(1);
    let report = controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/..."]);
    assert_eq!(report.items_removed, 2);
    assert_eq!(controller.tracked_locations(), 3);

    controller.set_minimum_expansion_depth(0);
    controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/a", "/a/..."]);
    assert_bound_eq(total_bound(&renderer), world_bound(&scene, "/"));
}

#[test]
fn test_expanded_paths() {
    let scene = chain();
    let (renderer, mut controller) = setup(&scene);
    controller.set_expanded_paths(matcher(&["/a", "/a/b/c"]));
    controller.update().unwrap();

    // `/a/b` is not expanded, so `/a/b/c` is never reached
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/..."]);

    controller.set_expanded_paths(matcher(&["/a", "/a/b", "/a/b/c"]));
    controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/c", "/a/b/c/d"]);
}

#[test]
fn test_set_scene_with_equal_content_issues_no_edits() {
    let (renderer, mut controller) = setup(&sphere_group());
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();
    let edits = renderer.edit_count();

    controller.set_scene(sphere_group());
    assert!(controller.update().unwrap().is_noop());
    assert_eq!(renderer.edit_count(), edits);
}

#[test]
fn test_set_context_reevaluates_motion() {
    let mut moving = sphere();
    moving.motion = Some(Vec3::new(1.0, 0.0, 0.0));
    let scene = Arc::new(MemoryScene::from_root(SceneNode::new().with_child("mover", moving)));
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(2);
    controller.update().unwrap();

    controller.set_context(Arc::new(Context::at_frame(2.0)));
    let report = controller.update().unwrap();
    assert_eq!(report.objects_updated, 1);

    let item = renderer.item(&RendererId::location(p("/mover"))).unwrap();
    assert_relative_eq!(item.transform[(0, 3)], 2.0);
}

#[test]
fn test_set_context_reevaluates_variables() {
    let group = SceneNode::new()
        .with_attribute("render:texture", "/textures/${shot}.exr")
        .with_child("sphere", sphere());
    let scene = Arc::new(MemoryScene::from_root(SceneNode::new().with_child("group", group)));
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(2);
    controller.set_context(Arc::new(Context::new().with_variable("shot", "sh010")));
    controller.update().unwrap();

    let id = RendererId::location(p("/group/sphere"));
    assert_eq!(renderer.item(&id).unwrap().attributes["render:texture"], Data::from("/textures/sh010.exr"));

    // Equal variables under a new context cost nothing
    controller.set_context(Arc::new(Context::new().with_variable("shot", "sh010")));
    assert!(controller.update().unwrap().is_noop());

    controller.set_context(Arc::new(Context::new().with_variable("shot", "sh020")));
    let report = controller.update().unwrap();
    assert_eq!(report.objects_updated, 1);
    assert_eq!(renderer.item(&id).unwrap().attributes["render:texture"], Data::from("/textures/sh020.exr"));
}

#[test]
fn test_missing_root_pushes_nothing() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_root(p("/group/missing"));

    let error = controller.update().unwrap_err();
    assert_eq!(error, ControllerError::MissingSceneTarget(p("/group/missing")));
    assert_eq!(renderer.edit_count(), 0);
    assert!(matches!(
        controller.update_matching_paths(&matcher(&["/group"])),
        Err(ControllerError::MissingSceneTarget(_))
    ));
}

#[test]
fn test_set_root_retracts_outside_items() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    controller.set_root(p("/group/sphere"));
    let report = controller.update().unwrap();
    assert_eq!(report.items_removed, 1);
    assert_eq!(ids(&renderer), ["/group/sphere"]);
}

#[test]
fn test_evaluation_failure_is_fail_fast() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    scene.fail_at(p("/group/sphere1"));

    let error = controller.update().unwrap_err();
    assert!(matches!(&error, ControllerError::Evaluation { path, .. } if *path == p("/group/sphere1")));
    assert_eq!(error.path(), Some(&p("/group/sphere1")));
    // Work before the failure stays in place
    assert_eq!(ids(&renderer), ["/group/sphere"]);

    scene.clear_failures();
    let report = controller.update().unwrap();
    assert_eq!(report.objects_created, 1);
    assert_eq!(ids(&renderer), ["/group/sphere", "/group/sphere1"]);
    assert!(controller.update().unwrap().is_noop());
}

#[test]
fn test_renderer_rejection_is_fail_fast() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    renderer.reject_path(p("/group/sphere"));

    let error = controller.update().unwrap_err();
    assert!(matches!(error, ControllerError::Renderer { ref path, .. } if *path == p("/group/sphere")));
    assert_eq!(renderer.edit_count(), 0);

    // The rejected location is retried on the next pass
    let again = controller.update().unwrap_err();
    assert_eq!(again, error);
}

#[test]
fn test_removed_and_hidden_locations_are_retracted() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    scene.remove(&p("/group/sphere1")).unwrap();
    let report = controller.update().unwrap();
    assert_eq!(report.items_removed, 1);
    assert_eq!(ids(&renderer), ["/group/sphere"]);

    scene
        .edit_node(&p("/group"), |node| {
            node.attributes.insert(VISIBILITY_ATTRIBUTE.to_string(), Data::Bool(false));
        })
        .unwrap();
    controller.update().unwrap();
    assert!(renderer.item_ids().is_empty());
    assert_eq!(controller.tracked_locations(), 1);

    scene
        .edit_node(&p("/group"), |node| node.attributes.remove(VISIBILITY_ATTRIBUTE))
        .unwrap();
    let report = controller.update().unwrap();
    assert_eq!(report.objects_created, 1);
    assert_eq!(ids(&renderer), ["/group/sphere"]);
}

#[test]
fn test_scoped_update_retracts_removed_location() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    scene.remove(&p("/group/sphere1")).unwrap();
    let report = controller.update_matching_paths(&matcher(&["/group/sphere1"])).unwrap();
    assert_eq!(report.items_removed, 1);
    assert_eq!(ids(&renderer), ["/group/sphere"]);
}

#[test]
fn test_set_membership_is_forwarded() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    scene.set_set("hero", matcher(&["/group/sphere"]));
    controller.update().unwrap();

    let id = RendererId::location(p("/group/sphere"));
    assert_eq!(
        renderer.item(&id).unwrap().attributes[SETS_ATTRIBUTE],
        Data::StringList(vec!["hero".to_string()])
    );
    let sibling = RendererId::location(p("/group/sphere1"));
    assert!(!renderer.item(&sibling).unwrap().attributes.contains_key(SETS_ATTRIBUTE));

    scene.remove_set("hero");
    let report = controller.update().unwrap();
    assert_eq!(report.objects_updated, 1);
    assert!(!renderer.item(&id).unwrap().attributes.contains_key(SETS_ATTRIBUTE));
}

#[test]
fn test_inherited_attributes_reach_items() {
    let scene = sphere_group();
    scene
        .edit_node(&p("/group"), |node| {
            node.attributes.insert("render:matte".to_string(), Data::Bool(true));
        })
        .unwrap();
    let (renderer, mut controller) = setup(&scene);
    controller.set_minimum_expansion_depth(3);
    controller.update().unwrap();

    let item = renderer.item(&RendererId::location(p("/group/sphere1"))).unwrap();
    assert_eq!(item.attributes["render:matte"], Data::Bool(true));
}

#[test]
fn test_globals_become_options() {
    let scene = sphere_group();
    let (renderer, mut controller) = setup(&scene);
    scene.set_global("render:resolution", Data::Int(1080));
    controller.update().unwrap();
    assert_eq!(renderer.option_value("render:resolution"), Some(Data::Int(1080)));

    scene.set_global("render:resolution", Data::Int(720));
    let report = controller.update().unwrap();
    assert_eq!(report.options_changed, 1);
    assert_eq!(renderer.option_value("render:resolution"), Some(Data::Int(720)));

    scene.remove_global("render:resolution");
    controller.update().unwrap();
    assert_eq!(renderer.option_value("render:resolution"), None);
    assert!(controller.update().unwrap().is_noop());
}

#[test]
fn test_rejected_option_names_the_option() {
    let scene = sphere_group();
    let (_renderer, mut controller) = setup(&scene);
    scene.set_global(SELECTION_OPTION, Data::Int(1));

    let error = controller.update().unwrap_err();
    assert!(matches!(error, ControllerError::RejectedOption { ref name, .. } if name == SELECTION_OPTION));
    assert_eq!(error.path(), None);
}

#[test]
fn test_with_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("controller.toml");
    std::fs::write(&path, "minimum_expansion_depth = 1\nexpanded_paths = [\"/a/b\"]\n").unwrap();
    let config = ControllerConfig::load_from_file(&path).unwrap();

    let scene = chain();
    let renderer = Arc::new(CapturingRenderer::default());
    let mut controller =
        RenderController::with_config(scene, Arc::new(Context::new()), renderer.clone(), config);
    assert_eq!(controller.minimum_expansion_depth(), 1);
    assert!(controller.expanded_paths().contains(&p("/a/b")));

    controller.update().unwrap();
    assert_eq!(ids(&renderer), ["/a", "/a/b", "/a/b/c", "/a/b/c/..."]);
}
