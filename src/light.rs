//! Point lights and their GPU resources.
//!
//! Each light owns its own uniform buffer and bind group so that the N
//! per-light shadow passes of a frame can be recorded into one encoder
//! without rewriting a shared buffer between passes.

use bytemuck::Zeroable;
use cgmath::Vector3;
use wgpu::util::DeviceExt;

/// Upper bound on lights folded into the composite pass.
pub const MAX_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    position: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing; the darkness scalar rides
    // in the padding slot.
    darkness: f32,
    color: [f32; 3],
    _padding: u32,
}

#[derive(Debug)]
pub struct Light {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    /// Light factor written by this light's shadow volumes: 1.0 casts no
    /// visible shadow, 0.0 is fully dark. Overlapping volumes accumulate via
    /// minimum, so the darkest volume wins per pixel.
    pub darkness: f32,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Light {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        position: Vector3<f32>,
        color: [f32; 3],
        darkness: f32,
    ) -> Self {
        let uniform = LightUniform {
            position: position.into(),
            darkness,
            color,
            _padding: 0,
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Light Bind Group"),
        });

        Self {
            position,
            color,
            darkness,
            buffer,
            bind_group,
        }
    }

    pub(crate) fn uniform(&self) -> LightUniform {
        LightUniform {
            position: self.position.into(),
            darkness: self.darkness,
            color: self.color,
            _padding: 0,
        }
    }

    /// Uploads the current position/colour/darkness. Called once per frame
    /// before any pass of that frame is submitted.
    pub(crate) fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform()]));
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// All lights of a scene packed for the composite pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightListUniform {
    lights: [LightUniform; MAX_LIGHTS],
    count: [u32; 4],
}

impl LightListUniform {
    pub fn from_lights(lights: &[Light]) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "scene has {} lights, only the first {} are composited",
                lights.len(),
                MAX_LIGHTS
            );
        }
        let mut packed = [LightUniform::zeroed(); MAX_LIGHTS];
        for (slot, light) in packed.iter_mut().zip(lights.iter()) {
            *slot = light.uniform();
        }
        Self {
            lights: packed,
            count: [lights.len().min(MAX_LIGHTS) as u32, 0, 0, 0],
        }
    }
}
