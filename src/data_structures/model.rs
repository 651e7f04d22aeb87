//! Meshes and materials: GPU geometry plus the shading state that draws it.
//!
//! A [`Mesh`] owns its vertex/index buffers, built once at import time, and
//! belongs to exactly one [`Material`] for its whole lifetime. A material is
//! never drawn on its own; it supplies the bind group a mesh needs right
//! before the mesh issues its indexed draw call. Which meshes use which
//! material (and which instances place which mesh) is tracked by the
//! [`crate::scene::Scene`] pools.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{Texture, create_default_sampler},
    scene::MaterialKey,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// CPU-side mesh description, as produced by an importer or by
/// [`crate::resources::primitives`].
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    material: MaterialKey,
}

impl Mesh {
    /// Uploads the geometry once; the buffers are never rewritten afterwards.
    pub(crate) fn new(device: &wgpu::Device, data: &MeshData, material: MaterialKey) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
            material,
        }
    }

    /// The material shading this mesh. Assigned at construction and immutable
    /// for the mesh's lifetime.
    pub fn material(&self) -> MaterialKey {
        self.material
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Arc<Texture>,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Arc<Texture>,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = match &diffuse_texture.sampler {
            Some(sampler) => sampler.clone(),
            None => create_default_sampler(device),
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
        }
    }
}

/// Render-pass extension for drawing meshes.
pub trait DrawMesh {
    /// Binds the mesh's geometry, lets the material configure shading state,
    /// then issues the indexed triangle draw.
    fn draw_mesh(&mut self, mesh: &Mesh, material: &Material);

    /// Same geometry, no material setup. The active (shared) shadow pipeline
    /// shades every mesh identically.
    fn draw_mesh_shadow(&mut self, mesh: &Mesh);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh, material: &Material) {
        self.set_bind_group(1, &material.bind_group, &[]);
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    fn draw_mesh_shadow(&mut self, mesh: &Mesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }
}
