//! Central GPU context: device, queue, bind-group layouts, pipelines and the
//! resource caches.
//!
//! One thread owns the context and runs the whole per-frame pipeline on it.
//! The window surface is split into its own type so the renderer can also run
//! headless (offscreen targets only), which is how the integration tests
//! drive it.

use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use winit::window::Window;

use crate::{
    data_structures::texture::Texture,
    pipelines::{BindGroupLayouts, Pipelines, RenderOptions},
    resources::cache::{AssetCache, ShaderCache},
};

pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: BindGroupLayouts,
    pub pipelines: Pipelines,
    pub shaders: ShaderCache,
    pub textures: AssetCache<Texture>,
    pub options: RenderOptions,
}

/// The presentable surface of a window, kept separate from the device state.
pub struct WindowSurface {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl Context {
    /// Creates a context rendering to `window`. The composite pass output
    /// format follows the surface format.
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, WindowSurface)> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible adapter found")?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The composite shader writes colours it expects to be presented as
        // sRGB.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let options = RenderOptions {
            output_format: surface_format,
            ..RenderOptions::default()
        };
        let context = Self::from_parts(device, queue, options);
        let window_surface = WindowSurface {
            window,
            surface,
            config,
        };
        Ok((context, window_surface))
    }

    /// Creates a context without a window. Rendering goes to offscreen
    /// targets; the composite output format comes from `options`.
    pub async fn headless(options: RenderOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible adapter found")?;
        let (device, queue) = request_device(&adapter).await?;
        Ok(Self::from_parts(device, queue, options))
    }

    fn from_parts(device: wgpu::Device, queue: wgpu::Queue, options: RenderOptions) -> Self {
        let layouts = BindGroupLayouts::new(&device);
        let shaders = ShaderCache::new();
        let pipelines = Pipelines::new(&device, &layouts, &shaders, &options);
        Self {
            device,
            queue,
            layouts,
            pipelines,
            shaders,
            textures: AssetCache::new(),
            options,
        }
    }

    /// Re-reads every file-backed shader source, recompiles and relinks the
    /// three pipelines. Render targets are untouched, and because the
    /// bind-group layouts are reused, every existing material/light bind
    /// group keeps working. On failure the previous pipelines stay in place.
    pub fn reload_shaders(&mut self) -> Result<()> {
        self.shaders.reload()?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipelines = Pipelines::new(&self.device, &self.layouts, &self.shaders, &self.options);
        let scope = self.device.pop_error_scope();
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });
        if let Some(error) = futures::executor::block_on(scope) {
            return Err(anyhow!("shader reload failed: {error}"));
        }

        self.pipelines = pipelines;
        Ok(())
    }

    /// Rebuilds the pipelines after [`Context::options`] changed, e.g. to
    /// toggle geometry-pass culling.
    pub fn rebuild_pipelines(&mut self) {
        self.pipelines = Pipelines::new(&self.device, &self.layouts, &self.shaders, &self.options);
    }

    /// Routes uncaptured GPU validation messages into the log. The render
    /// path itself performs no per-call validation; this hook is the only
    /// diagnostic channel and stays off unless installed.
    pub fn install_diagnostic_hook(&self) {
        self.device.on_uncaptured_error(Arc::new(|error| {
            log::error!("GPU error: {error}");
        }));
    }
}

impl WindowSurface {
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(device, &self.config);
    }

    pub fn acquire(&self) -> std::result::Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok((device, queue))
}
