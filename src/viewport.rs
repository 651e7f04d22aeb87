//! The viewport: owns the per-size render targets and orchestrates the
//! three-pass deferred pipeline every frame.
//!
//! Pass order is fixed because each pass consumes the previous one's output:
//! the geometry pass fills the position/normal/albedo textures and the depth
//! buffer, the per-light shadow passes accumulate a light factor against that
//! depth buffer, and the composite pass resolves all four textures into the
//! output view.
//!
//! A freshly created viewport is unsized; the first [`Viewport::on_size`]
//! call allocates its targets, and every later call reallocates them at the
//! new resolution.

use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform, vertical_fov},
    context::Context,
    data_structures::{scene_graph::DrawCmd, texture::Texture},
    light::LightListUniform,
    scene::Scene,
};

/// Default horizontal field of view (90 degrees). Kept constant across
/// resizes; the vertical field of view follows the aspect ratio.
pub const DEFAULT_HORIZ_FOV: f32 = std::f32::consts::FRAC_PI_2;

const DEFAULT_Z_NEAR: f32 = 0.1;

/// The per-draw model transform as it is stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
}

/// One uniform buffer holding every draw's world transform for the frame,
/// bound per draw through a dynamic offset. All transforms are uploaded
/// before the encoder is submitted, so no buffer is rewritten between the
/// passes of one frame.
pub struct TransformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
    stride: u32,
}

impl TransformArena {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let size = std::mem::size_of::<ModelUniform>() as u32;
        let stride = size.div_ceil(alignment) * alignment;
        let (buffer, bind_group) = Self::mk_buffer(device, layout, stride, capacity);
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
        }
    }

    fn mk_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u32,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Transform Arena"),
            size: stride as u64 * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
            label: Some("Model Transform Bind Group"),
        });
        (buffer, bind_group)
    }

    /// Writes every draw's world transform at its recording index, growing
    /// the buffer when the scene outgrew it.
    pub fn upload(&mut self, ctx: &Context, draws: &[DrawCmd]) {
        if draws.is_empty() {
            return;
        }
        if draws.len() > self.capacity {
            self.capacity = draws.len().next_power_of_two();
            let (buffer, bind_group) =
                Self::mk_buffer(&ctx.device, &ctx.layouts.model, self.stride, self.capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
        }

        let mut staged = vec![0u8; self.stride as usize * draws.len()];
        for (index, cmd) in draws.iter().enumerate() {
            let uniform = ModelUniform {
                model: cmd.world.into(),
            };
            let start = index * self.stride as usize;
            staged[start..start + std::mem::size_of::<ModelUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        ctx.queue.write_buffer(&self.buffer, 0, &staged);
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn offset(&self, index: usize) -> u32 {
        index as u32 * self.stride
    }
}

/// How many passes of each kind the last [`Viewport::render`] call issued.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassCounts {
    pub geometry: u32,
    pub shadow: u32,
    pub lighting: u32,
}

struct RenderTargets {
    position: Texture,
    normal: Texture,
    albedo: Texture,
    shadow: Texture,
    depth: Texture,
    composite_bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl RenderTargets {
    fn new(ctx: &Context, width: u32, height: u32) -> Self {
        let size = [width, height];
        let position =
            Texture::create_render_target(&ctx.device, size, Texture::POSITION_FORMAT, "position_target");
        let normal =
            Texture::create_render_target(&ctx.device, size, Texture::NORMAL_FORMAT, "normal_target");
        let albedo =
            Texture::create_render_target(&ctx.device, size, Texture::ALBEDO_FORMAT, "albedo_target");
        let shadow =
            Texture::create_render_target(&ctx.device, size, Texture::SHADOW_FORMAT, "shadow_target");
        let depth = Texture::create_depth_texture(&ctx.device, size, "depth_target");

        let composite_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.composite,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&shadow.view),
                },
            ],
            label: Some("Composite Bind Group"),
        });

        Self {
            position,
            normal,
            albedo,
            shadow,
            depth,
            composite_bind_group,
            size: (width, height),
        }
    }
}

pub struct Viewport {
    /// The camera whose view is rendered into this viewport.
    pub camera: Camera,
    horiz_fov: f32,
    targets: Option<RenderTargets>,
    transforms: TransformArena,
    frame_uniform: CameraUniform,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    light_list_buffer: wgpu::Buffer,
    light_list_bind_group: wgpu::BindGroup,
}

impl Viewport {
    pub fn new(ctx: &Context) -> Self {
        let frame_uniform = CameraUniform::new();
        let frame_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer"),
            contents: bytemuck::cast_slice(&[frame_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
            label: Some("Frame Bind Group"),
        });

        let light_list_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light List Buffer"),
            contents: bytemuck::cast_slice(&[LightListUniform::from_lights(&[])]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_list_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.light,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_list_buffer.as_entire_binding(),
            }],
            label: Some("Light List Bind Group"),
        });

        Self {
            camera: Camera::new(),
            horiz_fov: DEFAULT_HORIZ_FOV,
            targets: None,
            transforms: TransformArena::new(&ctx.device, &ctx.layouts.model, 64),
            frame_uniform,
            frame_buffer,
            frame_bind_group,
            light_list_buffer,
            light_list_bind_group,
        }
    }

    pub fn is_sized(&self) -> bool {
        self.targets.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.targets.as_ref().map(|targets| targets.size)
    }

    /// Reallocates every render target at the new resolution and recomputes
    /// the vertical field of view from the fixed horizontal one, so the
    /// horizontal view angle stays the same regardless of window shape.
    pub fn on_size(&mut self, ctx: &Context, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to {width}x{height}");
            return;
        }
        self.targets = Some(RenderTargets::new(ctx, width, height));
        self.camera.set_infinite_perspective_projection(
            self.horiz_fov,
            vertical_fov(self.horiz_fov, width, height),
            DEFAULT_Z_NEAR,
        );
    }

    /// Runs the frame: one geometry pass, one shadow-volume pass per light
    /// and one composite pass into `output`, in that order. Mutates nothing
    /// but GPU target contents; the returned counts tell what was issued.
    pub fn render(&mut self, ctx: &Context, scene: &Scene, output: &wgpu::TextureView) -> PassCounts {
        let mut counts = PassCounts::default();
        let Some(targets) = &self.targets else {
            log::warn!("viewport rendered before its first resize, skipping the frame");
            return counts;
        };

        // Record the scene and stage every upload for the frame; nothing is
        // written once the encoder is submitted.
        let draws = scene.collect_draws();
        self.transforms.upload(ctx, &draws);

        self.frame_uniform.update_view_proj(&self.camera);
        ctx.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[self.frame_uniform]));
        ctx.queue.write_buffer(
            &self.light_list_buffer,
            0,
            bytemuck::cast_slice(&[LightListUniform::from_lights(scene.lights())]),
        );
        for light in scene.lights() {
            light.write(&ctx.queue);
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Geometry pass: world-space position, normal and albedo of every
        // visible surface, depth test "less" with writes on, all cleared.
        {
            let colour_clear = |view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[
                    colour_clear(&targets.position.view),
                    colour_clear(&targets.normal.view),
                    colour_clear(&targets.albedo.view),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.pipelines.geometry);
            self.camera
                .render(scene, &draws, &self.frame_bind_group, &self.transforms, &mut pass);
        }
        counts.geometry += 1;

        // Shadow passes: the shadow texture starts fully lit (1.0) and each
        // light's volumes accumulate their darkness via minimum blending.
        if scene.lights().is_empty() {
            // No lights also means no darkening; just keep the texture lit.
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.shadow.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        for (index, light) in scene.lights().iter().enumerate() {
            let load = if index == 0 {
                wgpu::LoadOp::Clear(wgpu::Color::WHITE)
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Volume Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.shadow.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.pipelines.shadow);
            pass.set_bind_group(1, light.bind_group(), &[]);
            self.camera.render_shadow_volumes(
                scene,
                &draws,
                &self.frame_bind_group,
                &self.transforms,
                &mut pass,
            );
            counts.shadow += 1;
        }

        // Composite pass: no depth test, one full-screen quad resolving the
        // four textures into the final image.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lighting Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.pipelines.lighting);
            pass.set_bind_group(0, &targets.composite_bind_group, &[]);
            pass.set_bind_group(1, &self.light_list_bind_group, &[]);
            pass.draw(0..4, 0..1);
        }
        counts.lighting += 1;

        ctx.queue.submit(std::iter::once(encoder.finish()));
        counts
    }

    /// Reads the shadow accumulation texture back to the CPU as one f32 light
    /// factor per pixel, row-major.
    #[cfg(feature = "integration-tests")]
    pub fn read_shadow_texture(&self, ctx: &Context) -> anyhow::Result<(Vec<f32>, (u32, u32))> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("viewport is unsized"))?;
        let (width, height) = targets.size;

        const BYTES_PER_PIXEL: u32 = 2;
        let unpadded_bytes_per_row = width * BYTES_PER_PIXEL;
        let padded_bytes_per_row =
            unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
                * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Readback Buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Shadow Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &targets.shadow.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = ctx.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_secs(5)),
        });
        futures::executor::block_on(rx.receive())
            .ok_or_else(|| anyhow::anyhow!("shadow readback channel closed"))??;

        let data = slice.get_mapped_range();
        let mut factors = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let row_bytes = &data[start..start + unpadded_bytes_per_row as usize];
            for texel in row_bytes.chunks_exact(2) {
                factors.push(f16_bits_to_f32(u16::from_le_bytes([texel[0], texel[1]])));
            }
        }
        drop(data);
        readback.unmap();

        Ok((factors, (width, height)))
    }
}

/// Widens one IEEE 754 half-precision value.
#[cfg(feature = "integration-tests")]
fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = (bits >> 15) as u32;
    let exponent = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x3ff) as u32;
    match (exponent, mantissa) {
        (0, 0) => f32::from_bits(sign << 31),
        (0, _) => {
            let value = mantissa as f32 / 1024.0 * (2.0f32).powi(-14);
            if sign == 1 { -value } else { value }
        }
        (0x1f, 0) => {
            if sign == 1 {
                f32::NEG_INFINITY
            } else {
                f32::INFINITY
            }
        }
        (0x1f, _) => f32::NAN,
        _ => f32::from_bits((sign << 31) | ((exponent + 112) << 23) | (mantissa << 13)),
    }
}
