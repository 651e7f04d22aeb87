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

fn one_cube_scene(ctx: &umbra::context::Context) -> Scene {
    let mut scene = Scene::new();
    let material = solid_material(ctx, &mut scene, "slate", [120, 120, 140, 255]);
    let mesh = scene.add_mesh(ctx, &primitives::cube("cube", 1.0), material);
    let placement = scene.instantiate(mesh);
    scene
        .root
        .add_child(SceneNode::new(
            "cube",
            Matrix4::from_translation(Vector3::new(0.0, 0.0, 4.0)),
        ))
        .attach_instance(placement);
    scene
}

#[test]
fn one_geometry_pass_n_shadow_passes_one_lighting_pass() {
    let ctx = headless_context();
    let mut scene = one_cube_scene(&ctx);
    for x in 0..3 {
        scene.add_light(
            &ctx,
            Vector3::new(x as f32, 8.0, 4.0),
            [1.0, 1.0, 1.0],
            0.5,
        );
    }

    let mut viewport = Viewport::new(&ctx);
    viewport.on_size(&ctx, 64, 64);
    let output = output_target(&ctx, 64, 64);

    let counts = viewport.render(&ctx, &scene, &output);
    assert_eq!(
        counts,
        PassCounts {
            geometry: 1,
            shadow: 3,
            lighting: 1
        }
    );
}

#[test]
fn lightless_scenes_render_and_stay_fully_lit() {
    let ctx = headless_context();
    let scene = one_cube_scene(&ctx);

    let mut viewport = Viewport::new(&ctx);
    viewport.on_size(&ctx, 64, 64);
    let output = output_target(&ctx, 64, 64);

    let counts = viewport.render(&ctx, &scene, &output);
    assert_eq!(counts.shadow, 0);

    let (factors, _) = viewport.read_shadow_texture(&ctx).unwrap();
    assert!(factors.iter().all(|&f| f == 1.0));
}

#[test]
fn unsized_viewport_skips_the_frame() {
    let ctx = headless_context();
    let scene = one_cube_scene(&ctx);

    let mut viewport = Viewport::new(&ctx);
    assert!(!viewport.is_sized());
    let output = output_target(&ctx, 64, 64);

    let counts = viewport.render(&ctx, &scene, &output);
    assert_eq!(counts, PassCounts::default());
}

#[test]
fn resize_recomputes_the_vertical_fov_only() {
    let ctx = headless_context();
    let mut viewport = Viewport::new(&ctx);

    viewport.on_size(&ctx, 800, 600);
    let wide = *viewport.camera.projection_matrix();
    viewport.on_size(&ctx, 400, 300);
    let narrow = *viewport.camera.projection_matrix();

    // Same aspect ratio, same projection; the horizontal half-angle entry
    // never changes.
    assert!((wide[0][0] - narrow[0][0]).abs() < 1e-6);
    assert!((wide[1][1] - narrow[1][1]).abs() < 1e-6);
    assert_eq!(viewport.size(), Some((400, 300)));

    // A different aspect only moves the vertical entry:
    // tan(v/2) = tan(h/2) * height / width.
    viewport.on_size(&ctx, 400, 200);
    let half = *viewport.camera.projection_matrix();
    assert!((half[0][0] - narrow[0][0]).abs() < 1e-6);
    let expected = 1.0 / ((1.0 / narrow[0][0]) * 200.0 / 400.0);
    assert!((half[1][1] - expected).abs() < 1e-4);
}

#[test]
fn shader_reload_keeps_rendering() {
    let mut ctx = headless_context();
    let mut scene = one_cube_scene(&ctx);
    scene.add_light(&ctx, Vector3::new(0.0, 8.0, 4.0), [1.0, 1.0, 1.0], 0.5);

    let mut viewport = Viewport::new(&ctx);
    viewport.on_size(&ctx, 64, 64);
    let output = output_target(&ctx, 64, 64);
    viewport.render(&ctx, &scene, &output);

    // No file-backed sources yet, so this recompiles the embedded ones.
    ctx.reload_shaders().unwrap();

    let counts = viewport.render(&ctx, &scene, &output);
    assert_eq!(
        counts,
        PassCounts {
            geometry: 1,
            shadow: 1,
            lighting: 1
        }
    );
}
