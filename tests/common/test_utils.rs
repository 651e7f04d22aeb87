use std::sync::Arc;

use umbra::{
    context::Context,
    data_structures::{model::Material, texture::Texture},
    pipelines::RenderOptions,
    scene::{MaterialKey, Scene},
};

pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new()
        .expect("failed to start the test runtime")
        .block_on(future)
}

/// A device without a window. Tests render into offscreen targets only.
pub(crate) fn headless_context() -> Context {
    let _ = env_logger::try_init();
    block_on(Context::headless(RenderOptions::default()))
        .expect("integration tests need a GPU adapter")
}

/// Registers a single-colour material so tests don't depend on image assets.
pub(crate) fn solid_material(
    ctx: &Context,
    scene: &mut Scene,
    name: &str,
    rgba: [u8; 4],
) -> MaterialKey {
    let texture = Texture::create_solid(&ctx.device, &ctx.queue, rgba, name);
    scene.add_material(Material::new(
        &ctx.device,
        name,
        Arc::new(texture),
        &ctx.layouts.material,
    ))
}

/// An offscreen stand-in for the window surface the composite pass targets.
pub(crate) fn output_target(ctx: &Context, width: u32, height: u32) -> wgpu::TextureView {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Output Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.options.output_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
