#![cfg(feature = "integration-tests")]

mod common;

use cgmath::{Matrix4, Vector3};
use common::test_utils::{headless_context, output_target, solid_material};
use umbra::{
    data_structures::scene_graph::SceneNode,
    resources::primitives,
    scene::Scene,
    viewport::{PassCounts, Viewport},
};

/// One light, two non-overlapping cubes: the small cube hangs between the
/// light and the big cube and blocks a region of its top face. After running
/// all three passes, the shadow texture must read below 1.0 inside that
/// blocked footprint and exactly 1.0 where no shadow volume projects at all.
#[test]
fn occluded_pixels_darken_while_clear_pixels_stay_lit() {
    let ctx = headless_context();
    let mut scene = Scene::new();
    let chalk = solid_material(&ctx, &mut scene, "chalk", [255, 255, 255, 255]);

    let occluder = scene.add_mesh(&ctx, &primitives::cube("occluder", 1.0), chalk);
    let receiver = scene.add_mesh(&ctx, &primitives::cube("receiver", 4.0), chalk);

    let placement = scene.instantiate(occluder);
    scene
        .root
        .add_child(SceneNode::new(
            "occluder",
            Matrix4::from_translation(Vector3::new(0.0, 2.0, 5.0)),
        ))
        .attach_instance(placement);
    let placement = scene.instantiate(receiver);
    scene
        .root
        .add_child(SceneNode::new(
            "receiver",
            Matrix4::from_translation(Vector3::new(0.0, -3.0, 5.0)),
        ))
        .attach_instance(placement);

    // Directly above the occluder, so its shadow falls straight down onto
    // the receiver's top face.
    scene.add_light(&ctx, Vector3::new(0.0, 10.0, 5.0), [1.0, 1.0, 1.0], 0.25);

    let mut viewport = Viewport::new(&ctx);
    viewport.on_size(&ctx, 256, 256);
    let output = output_target(&ctx, 256, 256);

    let counts = viewport.render(&ctx, &scene, &output);
    assert_eq!(
        counts,
        PassCounts {
            geometry: 1,
            shadow: 1,
            lighting: 1
        }
    );

    let (factors, (width, _)) = viewport.read_shadow_texture(&ctx).unwrap();
    let at = |x: u32, y: u32| factors[(y * width + x) as usize];

    // The receiver's top face at world (0, -1, 5) projects to the middle of
    // the lower half of the frame; the occluder hangs straight above it.
    let occluded = at(128, 154);
    assert!(
        occluded < 0.99,
        "occluded footprint should darken, read {occluded}"
    );

    // Above the whole scene: the light sits on top, every volume extrudes
    // downward, so nothing projects into the sky.
    assert_eq!(at(12, 12), 1.0, "pixel clear of every volume must stay lit");
}

/// Overlapping casters must not compound below the darkest single factor.
#[test]
fn overlapping_volumes_accumulate_the_minimum() {
    let ctx = headless_context();
    let mut scene = Scene::new();
    let chalk = solid_material(&ctx, &mut scene, "chalk", [255, 255, 255, 255]);

    let occluder = scene.add_mesh(&ctx, &primitives::cube("occluder", 1.0), chalk);
    let receiver = scene.add_mesh(&ctx, &primitives::cube("receiver", 4.0), chalk);

    // Two stacked occluders casting onto the same footprint.
    for height in [2.0, 3.5] {
        let placement = scene.instantiate(occluder);
        scene
            .root
            .add_child(SceneNode::new(
                "occluder",
                Matrix4::from_translation(Vector3::new(0.0, height, 5.0)),
            ))
            .attach_instance(placement);
    }
    let placement = scene.instantiate(receiver);
    scene
        .root
        .add_child(SceneNode::new(
            "receiver",
            Matrix4::from_translation(Vector3::new(0.0, -3.0, 5.0)),
        ))
        .attach_instance(placement);

    scene.add_light(&ctx, Vector3::new(0.0, 10.0, 5.0), [1.0, 1.0, 1.0], 0.25);

    let mut viewport = Viewport::new(&ctx);
    viewport.on_size(&ctx, 256, 256);
    let output = output_target(&ctx, 256, 256);
    viewport.render(&ctx, &scene, &output);

    let (factors, (width, _)) = viewport.read_shadow_texture(&ctx).unwrap();
    let occluded = factors[(154 * width + 128) as usize];
    assert!(occluded < 0.99);
    // Minimum accumulation, not multiplication: two 0.25 volumes still
    // read 0.25, never 0.0625.
    assert!(
        occluded > 0.2,
        "overlapping volumes double-darkened: {occluded}"
    );
}
