// Asset loading and lifetime management
//
// Provides the reference-counted registry, the two-phase load/finalize
// pipeline, and the background loader thread.

mod asset;
mod atlas;
mod background;
mod file;
mod hot_reload;
mod manager;
mod material;
mod mesh;
mod shader;
mod texture;

pub use asset::{Asset, LoadState};
pub use atlas::{AtlasAsset, AtlasDesc, AtlasRegion, RegionDesc};
pub use file::RawFileAsset;
pub use manager::{AssetManager, FinalizeContext, RegistryStats};
pub use material::{MaterialAsset, MaterialDesc};
pub use mesh::MeshAsset;
pub use shader::ShaderAsset;
pub use texture::{TextureAsset, TextureOptions};

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to a registry entry
///
/// The mutex guards the asset's contents; the registry's reference count,
/// not the `Arc` count, decides when backend resources are destroyed.
pub type AssetRef<A> = Arc<Mutex<A>>;

pub type ShaderRef = AssetRef<ShaderAsset>;
pub type TextureRef = AssetRef<TextureAsset>;
pub type AtlasRef = AssetRef<AtlasAsset>;
pub type MaterialRef = AssetRef<MaterialAsset>;
pub type MeshRef = AssetRef<MeshAsset>;
pub type FileRef = AssetRef<RawFileAsset>;

/// Asset pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to load asset: {0}")]
    LoadError(String),

    #[error("Failed to decode '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("Invalid descriptor '{name}': {reason}")]
    Descriptor { name: String, reason: String },

    #[error("Background loader is stopped")]
    LoaderStopped,

    #[error(transparent)]
    File(#[from] crate::io::FileError),

    #[error(transparent)]
    Render(#[from] crate::renderer::RenderError),
}

/// The kinds of asset the registry manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Shader,
    Texture,
    Atlas,
    Material,
    Mesh,
    File,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Shader => "shader",
            AssetKind::Texture => "texture",
            AssetKind::Atlas => "atlas",
            AssetKind::Material => "material",
            AssetKind::Mesh => "mesh",
            AssetKind::File => "file",
        };
        f.write_str(name)
    }
}

/// Where the CPU half of a load runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Load and finalize on the calling thread before returning
    #[default]
    Blocking,
    /// Queue for the worker thread; the asset becomes usable after a later
    /// [`AssetManager::try_finalize`] picks it up
    Background,
}

/// Common options accepted by the load entry points
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Registry key to use instead of the file name
    pub alias: Option<String>,
}

impl LoadOptions {
    pub fn aliased(alias: &str) -> Self {
        Self {
            alias: Some(alias.to_string()),
        }
    }
}

/// Registry address of an acquired dependency
///
/// Assets that acquire other assets during finalize record one of these per
/// acquisition and hand them back from `release`, so the registry can drop
/// the counted references when the owner goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepKey {
    pub kind: AssetKind,
    pub key: String,
}

impl DepKey {
    pub fn new(kind: AssetKind, key: &str) -> Self {
        Self {
            kind,
            key: key.to_string(),
        }
    }

    pub fn shader(key: &str) -> Self {
        Self::new(AssetKind::Shader, key)
    }

    pub fn texture(key: &str) -> Self {
        Self::new(AssetKind::Texture, key)
    }

    pub fn material(key: &str) -> Self {
        Self::new(AssetKind::Material, key)
    }
}
