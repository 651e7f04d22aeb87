//! File-keyed resource caching.
//!
//! [`AssetCache`] hands out shared handles keyed by file name: the backing
//! file is loaded on the first request, later requests return the previously
//! loaded handle, and the entry falls out of the cache once the last handle
//! is dropped.
//!
//! [`ShaderCache`] keeps the WGSL source of the three pipeline programs. The
//! sources are embedded as defaults and can be overridden from disk, which is
//! what makes the shader-reload command able to pick up edited files.

use std::{
    cell::RefCell,
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Weak},
};

use anyhow::{Context as _, Result};

pub struct AssetCache<T> {
    entries: RefCell<HashMap<String, Weak<T>>>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the cached handle for `key`, or invokes `load` and caches the
    /// result. A load failure is propagated and nothing is cached for `key`.
    pub fn get_or_load(
        &self,
        key: &str,
        load: impl FnOnce(&str) -> Result<T>,
    ) -> Result<Arc<T>> {
        if let Some(alive) = self.entries.borrow().get(key).and_then(Weak::upgrade) {
            return Ok(alive);
        }
        let loaded = Arc::new(load(key)?);
        self.entries
            .borrow_mut()
            .insert(key.to_string(), Arc::downgrade(&loaded));
        Ok(loaded)
    }

    /// Number of entries whose handle is still alive. Dead entries are
    /// dropped on the way.
    pub fn live_count(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.len()
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct ShaderEntry {
    path: Option<PathBuf>,
    source: String,
}

pub struct ShaderCache {
    entries: HashMap<&'static str, ShaderEntry>,
}

impl ShaderCache {
    pub const GEOMETRY: &'static str = "gbuffer";
    pub const SHADOW: &'static str = "shadow";
    pub const LIGHTING: &'static str = "lighting";

    pub fn new() -> Self {
        let embedded = [
            (Self::GEOMETRY, include_str!("../pipelines/gbuffer.wgsl")),
            (Self::SHADOW, include_str!("../pipelines/shadow.wgsl")),
            (Self::LIGHTING, include_str!("../pipelines/lighting.wgsl")),
        ];
        Self {
            entries: embedded
                .into_iter()
                .map(|(name, source)| {
                    (
                        name,
                        ShaderEntry {
                            path: None,
                            source: source.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn source(&self, name: &str) -> &str {
        &self
            .entries
            .get(name)
            .expect("every pipeline shader is registered at construction")
            .source
    }

    /// Replaces `name`'s source with the contents of `path` and remembers the
    /// path so [`ShaderCache::reload`] re-reads it.
    pub fn override_from_file(
        &mut self,
        name: &'static str,
        path: impl AsRef<std::path::Path>,
    ) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read shader source {}", path.display()))?;
        let entry = self
            .entries
            .get_mut(name)
            .expect("every pipeline shader is registered at construction");
        entry.path = Some(path);
        entry.source = source;
        Ok(())
    }

    /// Re-reads every file-backed source from disk. All files are read before
    /// any entry is replaced, so a missing file leaves the cache as it was.
    pub fn reload(&mut self) -> Result<()> {
        let mut fresh = Vec::new();
        for (name, entry) in &self.entries {
            if let Some(path) = &entry.path {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to reload shader source {}", path.display()))?;
                fresh.push((*name, source));
            }
        }
        for (name, source) in fresh {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.source = source;
            }
        }
        Ok(())
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}
