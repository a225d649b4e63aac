// Texture atlas assets: named sub-regions of a shared texture

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::io::FileSource;
use crate::renderer::RenderDevice;

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::texture::TextureOptions;
use super::{AssetError, AssetKind, DepKey, TextureRef};

/// On-disk atlas descriptor (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasDesc {
    /// Image file the regions index into
    pub texture: String,
    /// Atlas pixel dimensions, used to normalize region coordinates
    pub width: u32,
    pub height: u32,
    pub regions: Vec<RegionDesc>,
}

/// One rectangle inside the atlas, in pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDesc {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A named atlas region with precomputed UV coordinates
#[derive(Debug, Clone)]
pub struct AtlasRegion {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

impl AtlasRegion {
    fn from_desc(desc: &RegionDesc, atlas_width: u32, atlas_height: u32) -> Self {
        let uv_min = Vec2::new(
            desc.x as f32 / atlas_width as f32,
            desc.y as f32 / atlas_height as f32,
        );
        let uv_max = Vec2::new(
            (desc.x + desc.width) as f32 / atlas_width as f32,
            (desc.y + desc.height) as f32 / atlas_height as f32,
        );

        Self {
            name: desc.name.clone(),
            x: desc.x,
            y: desc.y,
            width: desc.width,
            height: desc.height,
            uv_min,
            uv_max,
        }
    }

    /// Region size in pixels
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// A texture atlas loaded from a JSON descriptor
///
/// The descriptor parse and UV precomputation happen in `load`; `finalize`
/// resolves the referenced texture through the registry, loading it on the
/// spot when it is not already registered.
pub struct AtlasAsset {
    name: String,
    state: LoadState,
    error: Option<String>,
    texture_name: Option<String>,
    width: u32,
    height: u32,
    regions: Vec<AtlasRegion>,
    texture: Option<TextureRef>,
    deps: Vec<DepKey>,
}

impl AtlasAsset {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LoadState::NotStarted,
            error: None,
            texture_name: None,
            width: 0,
            height: 0,
            regions: Vec::new(),
            texture: None,
            deps: Vec::new(),
        }
    }

    /// Atlas pixel dimensions from the descriptor
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Look up a region by name
    pub fn region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn regions(&self) -> &[AtlasRegion] {
        &self.regions
    }

    /// The resolved backing texture, present once finalized
    pub fn texture(&self) -> Option<&TextureRef> {
        self.texture.as_ref()
    }

    fn parse(&mut self, io: &FileSource) -> Result<(), AssetError> {
        let bytes = io.load_file(&self.name)?;
        let desc: AtlasDesc =
            serde_json::from_slice(&bytes).map_err(|e| AssetError::Descriptor {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        if desc.width == 0 || desc.height == 0 {
            return Err(AssetError::Descriptor {
                name: self.name.clone(),
                reason: format!("atlas extent {}x{} is empty", desc.width, desc.height),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for region in &desc.regions {
            // Widen before adding so corrupt descriptors cannot overflow
            let right = region.x as u64 + region.width as u64;
            let bottom = region.y as u64 + region.height as u64;
            if right > desc.width as u64 || bottom > desc.height as u64 {
                return Err(AssetError::Descriptor {
                    name: self.name.clone(),
                    reason: format!("region '{}' exceeds atlas bounds", region.name),
                });
            }
            if !seen.insert(region.name.as_str()) {
                return Err(AssetError::Descriptor {
                    name: self.name.clone(),
                    reason: format!("duplicate region name '{}'", region.name),
                });
            }
        }

        self.regions = desc
            .regions
            .iter()
            .map(|r| AtlasRegion::from_desc(r, desc.width, desc.height))
            .collect();
        self.width = desc.width;
        self.height = desc.height;
        self.texture_name = Some(desc.texture);
        Ok(())
    }
}

impl Asset for AtlasAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Atlas
    }

    fn state(&self) -> LoadState {
        self.state
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn load(&mut self, io: &FileSource) -> Result<(), AssetError> {
        self.state = LoadState::Loading;
        match self.parse(io) {
            Ok(()) => {
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = LoadState::Failed;
                Err(e)
            }
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) -> Result<(), AssetError> {
        match self.state {
            LoadState::Loaded => {}
            LoadState::Finalized => return Ok(()),
            _ => return Err(settle_failed(&mut self.state, &mut self.error, &self.name)),
        }

        let Some(texture_name) = self.texture_name.clone() else {
            return Err(settle_failed(&mut self.state, &mut self.error, &self.name));
        };

        match ctx.acquire_texture(&texture_name, TextureOptions::default()) {
            Ok(texture) => {
                self.texture = Some(texture);
                self.deps.push(DepKey::texture(&texture_name));
                self.state = LoadState::Finalized;
                log::debug!(
                    "Finalized atlas '{}' ({} regions over '{}')",
                    self.name,
                    self.regions.len(),
                    texture_name
                );
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("texture '{texture_name}': {e}"));
                self.state = LoadState::Failed;
                Err(e)
            }
        }
    }

    fn release(&mut self, _device: &mut dyn RenderDevice) -> Vec<DepKey> {
        self.texture = None;
        self.regions.clear();
        self.state = LoadState::Released;
        std::mem::take(&mut self.deps)
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
