//! Texture loading helpers.

use std::sync::Arc;

use crate::{
    data_structures::texture::Texture,
    resources::{cache::AssetCache, load_binary},
};

/// Loads and uploads a texture from the `assets` directory.
///
/// # Arguments
///
/// * `format` is an optional file format hint (e.g., "png"). If None, auto-detect.
pub fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name)?;
    Texture::from_bytes(device, queue, &data, file_name, format)
}

/// Cache-aware variant of [`load_texture`]: the file is decoded and uploaded
/// once, every later call with the same name returns the shared handle.
pub fn load_texture_cached(
    cache: &AssetCache<Texture>,
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Arc<Texture>> {
    cache.get_or_load(file_name, |name| load_texture(name, device, queue, None))
}
