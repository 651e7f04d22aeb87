//! Loading of textures and shader sources from external files, plus the
//! file-keyed cache that shares the loaded handles.
//!
//! Asset I/O happens at load time, before rendering starts; nothing in this
//! module is touched from the per-frame path.

use std::path::Path;

pub mod cache;
pub mod primitives;
pub mod texture;

/// Reads a text asset relative to the `assets` directory.
pub fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = Path::new("./").join("assets").join(file_name);
    Ok(std::fs::read_to_string(path)?)
}

/// Reads a binary asset relative to the `assets` directory.
pub fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = Path::new("./").join("assets").join(file_name);
    Ok(std::fs::read(path)?)
}
