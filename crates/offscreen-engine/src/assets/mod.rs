//! Asset path resolution and shader loading.
//!
//! The platform base path is the working directory on Windows (so IDE runs find
//! assets next to the project) and the executable's directory elsewhere.
//! Extra roots can be appended as fallbacks; the first root containing the
//! asset wins.

mod shader;

use std::path::{Path, PathBuf};

pub use shader::ShaderSource;

use crate::error::{RenderError, Result};

/// Directory holding the shaders shipped with this crate.
pub const BUNDLED_ASSET_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

#[derive(Debug, Clone)]
pub struct AssetLocator {
    roots: Vec<PathBuf>,
}

impl AssetLocator {
    /// Locator with a single root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { roots: vec![root.into()] }
    }

    /// Locator rooted at the platform base path.
    pub fn platform_default() -> Self {
        Self::new(platform_base_path())
    }

    /// Appends a fallback root searched after the existing ones.
    pub fn with_fallback(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Candidate paths for `name`, in search order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        self.roots.iter().map(|root| root.join(name)).collect()
    }

    /// First existing path for `name`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name).into_iter().find(|p| p.is_file())
    }

    /// Resolves and reads a shader in full.
    ///
    /// `entry_points` lists the functions the pipeline will reference; a file
    /// missing any of them is rejected before it reaches the GPU.
    pub fn load_shader(&self, name: &str, entry_points: &[&str]) -> Result<ShaderSource> {
        let path = self.resolve(name).ok_or_else(|| RenderError::ShaderNotFound {
            name: name.to_string(),
            searched: self.candidates(name),
        })?;
        log::debug!("loading shader '{name}' from {}", path.display());
        ShaderSource::read(&path, entry_points)
    }
}

impl Default for AssetLocator {
    fn default() -> Self {
        Self::platform_default()
    }
}

fn platform_base_path() -> PathBuf {
    if cfg!(windows) {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
