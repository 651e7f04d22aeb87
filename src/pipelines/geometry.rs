//! The geometry-buffer pipeline and the shared pipeline constructor.

use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::BindGroupLayouts,
};

pub fn mk_geometry_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    shader_source: &str,
    cull_back_faces: bool,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Geometry Pipeline Layout"),
        bind_group_layouts: &[&layouts.frame, &layouts.material, &layouts.model],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("GBuffer Shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    };

    let replace = |format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            write_mask: wgpu::ColorWrites::ALL,
        })
    };

    mk_render_pipeline(
        device,
        &layout,
        &[
            replace(Texture::POSITION_FORMAT),
            replace(Texture::NORMAL_FORMAT),
            replace(Texture::ALBEDO_FORMAT),
        ],
        Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        if cull_back_faces {
            Some(wgpu::Face::Back)
        } else {
            None
        },
        wgpu::PrimitiveTopology::TriangleList,
        &[ModelVertex::desc()],
        shader,
    )
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    targets: &[Option<wgpu::ColorTargetState>],
    depth_stencil: Option<wgpu::DepthStencilState>,
    cull_mode: Option<wgpu::Face>,
    topology: wgpu::PrimitiveTopology,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            // The view matrix flips handedness relative to the usual
            // right-handed setup (the camera looks down +z), which mirrors
            // the apparent winding.
            front_face: wgpu::FrontFace::Cw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
