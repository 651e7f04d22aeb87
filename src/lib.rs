//! umbra
//!
//! A real-time renderer demonstrating a stencil-free, depth-fail volumetric
//! shadow technique composited through a deferred-shading pipeline. Scene
//! geometry is rasterized once into a geometry buffer, each light darkens a
//! shadow texture by rendering extruded shadow volumes against the geometry
//! depth, and a final full-screen pass resolves everything into the output.
//!
//! High-level modules
//! - `camera`: camera type with view/projection math and the frame uniform
//! - `context`: central GPU context owning device/queue/pipelines and caches
//! - `data_structures`: meshes, materials, textures and the scene graph
//! - `light`: point lights and their GPU resources
//! - `pipelines`: the geometry, shadow-volume and composite pipelines
//! - `resources`: file loading and the shared asset/shader caches
//! - `scene`: owning pools, the light list and the node tree root
//! - `viewport`: render targets and per-frame pass orchestration
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod light;
pub mod pipelines;
pub mod resources;
pub mod scene;
pub mod viewport;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::window::Window;
