//! Engine data structures: meshes, materials, textures and the scene graph.
//!
//! - `model` contains mesh and material definitions and their GPU resources
//! - `texture` contains the GPU texture wrapper and render-target helpers
//! - `scene_graph` enables hierarchical scene organization
//! - `membership` tracks which meshes a material shades and which instances
//!   place a mesh

pub(crate) mod membership;
pub mod model;
pub mod scene_graph;
pub mod texture;
