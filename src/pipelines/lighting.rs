//! The lighting/composite pipeline: a full-screen quad with no depth test
//! that resolves the geometry buffer and the shadow texture into the final
//! image.

use crate::pipelines::{BindGroupLayouts, geometry::mk_render_pipeline};

pub fn mk_lighting_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    shader_source: &str,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lighting Pipeline Layout"),
        bind_group_layouts: &[&layouts.composite, &layouts.light],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lighting Shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        &[Some(wgpu::ColorTargetState {
            format: output_format,
            blend: Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            write_mask: wgpu::ColorWrites::ALL,
        })],
        None,
        None,
        wgpu::PrimitiveTopology::TriangleStrip,
        &[],
        shader,
    )
}
