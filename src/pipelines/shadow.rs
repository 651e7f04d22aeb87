//! The shadow-volume pipeline.
//!
//! Realizes the stencil-free depth-fail technique: front faces are culled so
//! only the back-facing shadow-volume polygons rasterize, the depth test is
//! "greater" against the geometry pass's depth buffer with writes disabled,
//! and minimum blending accumulates the darkest factor per pixel.

use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::{BindGroupLayouts, geometry::mk_render_pipeline},
};

pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    shader_source: &str,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[&layouts.frame, &layouts.light, &layouts.model],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    };

    let min_blend = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Min,
    };

    mk_render_pipeline(
        device,
        &layout,
        &[Some(wgpu::ColorTargetState {
            format: Texture::SHADOW_FORMAT,
            blend: Some(wgpu::BlendState {
                color: min_blend,
                alpha: min_blend,
            }),
            write_mask: wgpu::ColorWrites::ALL,
        })],
        Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Greater,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        Some(wgpu::Face::Front),
        wgpu::PrimitiveTopology::TriangleList,
        &[ModelVertex::desc()],
        shader,
    )
}
