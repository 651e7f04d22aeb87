//! Definitions for the three render pipelines of the deferred pipeline:
//! geometry buffer, shadow volumes and the lighting composite. Bind-group
//! layouts are created once and shared so that rebuilding pipelines (shader
//! reload) never invalidates existing bind groups.

pub mod geometry;
pub mod lighting;
pub mod shadow;

use crate::resources::cache::ShaderCache;

pub struct BindGroupLayouts {
    /// Per-frame camera data (view, projection, eye position).
    pub frame: wgpu::BindGroupLayout,
    /// Diffuse texture and sampler of one material.
    pub material: wgpu::BindGroupLayout,
    /// Per-draw model transform, bound with a dynamic offset.
    pub model: wgpu::BindGroupLayout,
    /// One light (shadow pass) or the packed light list (composite pass).
    pub light: wgpu::BindGroupLayout,
    /// The four geometry/shadow textures read by the composite pass.
    pub composite: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            frame: uniform_layout(device, wgpu::ShaderStages::VERTEX_FRAGMENT, false, "frame_bind_group_layout"),
            material: material_layout(device),
            model: uniform_layout(device, wgpu::ShaderStages::VERTEX, true, "model_bind_group_layout"),
            light: uniform_layout(device, wgpu::ShaderStages::VERTEX_FRAGMENT, false, "light_bind_group_layout"),
            composite: composite_layout(device),
        }
    }
}

fn uniform_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    label: &str,
) -> wgpu::BindGroupLayout {
    let min_binding_size = if has_dynamic_offset {
        wgpu::BufferSize::new(std::mem::size_of::<crate::viewport::ModelUniform>() as u64)
    } else {
        None
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size,
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

fn composite_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    // Position, normal, albedo, shadow. Read with textureLoad, so no sampler
    // and no filterable requirement.
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            texture_entry(0),
            texture_entry(1),
            texture_entry(2),
            texture_entry(3),
        ],
        label: Some("composite_bind_group_layout"),
    })
}

/// Options baked into the pipelines at creation (and reload) time.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Whether the geometry pass culls back faces. Off by default so
    /// double-sided materials rasterize both sides into the geometry buffer.
    pub cull_back_faces: bool,
    /// Format of the composite pass's output target (the surface format when
    /// rendering to a window).
    pub output_format: wgpu::TextureFormat,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cull_back_faces: false,
            output_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

pub struct Pipelines {
    pub geometry: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub lighting: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        shaders: &ShaderCache,
        options: &RenderOptions,
    ) -> Self {
        Self {
            geometry: geometry::mk_geometry_pipeline(
                device,
                layouts,
                shaders.source(ShaderCache::GEOMETRY),
                options.cull_back_faces,
            ),
            shadow: shadow::mk_shadow_pipeline(device, layouts, shaders.source(ShaderCache::SHADOW)),
            lighting: lighting::mk_lighting_pipeline(
                device,
                layouts,
                shaders.source(ShaderCache::LIGHTING),
                options.output_format,
            ),
        }
    }
}
