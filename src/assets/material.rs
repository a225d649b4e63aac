// Material assets: a shader plus textures and scalar parameters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::io::FileSource;
use crate::renderer::RenderDevice;

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::texture::TextureOptions;
use super::{AssetError, AssetKind, DepKey, ShaderRef, TextureRef};

/// On-disk material descriptor (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// WGSL shader file this material renders with
    pub shader: String,
    /// Texture files bound in declaration order
    #[serde(default)]
    pub textures: Vec<String>,
    /// Named scalar parameters for the shader
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

/// A material loaded from a JSON descriptor
///
/// `finalize` acquires the shader and every texture through the registry,
/// so unloading the material drops those references again. Acquisitions
/// made before a failing one are kept and released with the material.
pub struct MaterialAsset {
    name: String,
    state: LoadState,
    error: Option<String>,
    desc: Option<MaterialDesc>,
    shader: Option<ShaderRef>,
    textures: Vec<TextureRef>,
    deps: Vec<DepKey>,
}

impl MaterialAsset {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LoadState::NotStarted,
            error: None,
            desc: None,
            shader: None,
            textures: Vec::new(),
            deps: Vec::new(),
        }
    }

    /// The resolved shader, present once finalized
    pub fn shader(&self) -> Option<&ShaderRef> {
        self.shader.as_ref()
    }

    /// Resolved textures in descriptor order
    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    /// Scalar parameter by name
    pub fn param(&self, name: &str) -> Option<f32> {
        self.desc.as_ref().and_then(|d| d.params.get(name).copied())
    }

    fn parse(&mut self, io: &FileSource) -> Result<(), AssetError> {
        let bytes = io.load_file(&self.name)?;
        let desc: MaterialDesc =
            serde_json::from_slice(&bytes).map_err(|e| AssetError::Descriptor {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        if desc.shader.trim().is_empty() {
            return Err(AssetError::Descriptor {
                name: self.name.clone(),
                reason: "material has no shader".to_string(),
            });
        }

        self.desc = Some(desc);
        Ok(())
    }
}

impl Asset for MaterialAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Material
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

        let Some(desc) = self.desc.clone() else {
            return Err(settle_failed(&mut self.state, &mut self.error, &self.name));
        };

        match ctx.acquire_shader(&desc.shader) {
            Ok(shader) => {
                self.shader = Some(shader);
                self.deps.push(DepKey::shader(&desc.shader));
            }
            Err(e) => {
                self.error = Some(format!("shader '{}': {e}", desc.shader));
                self.state = LoadState::Failed;
                return Err(e);
            }
        }

        for texture_name in &desc.textures {
            match ctx.acquire_texture(texture_name, TextureOptions::default()) {
                Ok(texture) => {
                    self.textures.push(texture);
                    self.deps.push(DepKey::texture(texture_name));
                }
                Err(e) => {
                    self.error = Some(format!("texture '{texture_name}': {e}"));
                    self.state = LoadState::Failed;
                    return Err(e);
                }
            }
        }

        self.state = LoadState::Finalized;
        log::debug!(
            "Finalized material '{}' (shader '{}', {} textures)",
            self.name,
            desc.shader,
            desc.textures.len()
        );
        Ok(())
    }

    fn release(&mut self, _device: &mut dyn RenderDevice) -> Vec<DepKey> {
        self.shader = None;
        self.textures.clear();
        self.state = LoadState::Released;
        std::mem::take(&mut self.deps)
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
