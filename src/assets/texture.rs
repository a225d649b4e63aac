// Texture assets: image files decoded to RGBA8 and uploaded as GPU textures

use crate::io::FileSource;
use crate::renderer::{FilterMode, PixelFormat, RenderDevice, TextureDesc, TextureId};

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::{AssetError, AssetKind, DepKey};

/// Options for texture loading
#[derive(Debug, Clone, Default)]
pub struct TextureOptions {
    /// Registry key to use instead of the file name
    pub alias: Option<String>,
    pub format: PixelFormat,
    pub filter: FilterMode,
}

impl TextureOptions {
    /// Options with an alias and default format settings
    pub fn aliased(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Default::default()
        }
    }
}

/// A texture loaded from an image file
///
/// `load` decodes the image to tightly packed RGBA8 on whatever thread runs
/// it; `finalize` uploads the pixels and drops the CPU copy.
pub struct TextureAsset {
    name: String,
    options: TextureOptions,
    state: LoadState,
    error: Option<String>,
    pixels: Option<Vec<u8>>,
    width: u32,
    height: u32,
    handle: Option<TextureId>,
}

impl TextureAsset {
    pub(crate) fn new(name: &str, options: TextureOptions) -> Self {
        Self {
            name: name.to_string(),
            options,
            state: LoadState::NotStarted,
            error: None,
            pixels: None,
            width: 0,
            height: 0,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<TextureId> {
        self.handle
    }

    /// Pixel dimensions, valid once loading has finished
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decode(&mut self, io: &FileSource) -> Result<(), AssetError> {
        let bytes = io.load_file(&self.name)?;
        let image = image::load_from_memory(&bytes).map_err(|e| AssetError::Decode {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;

        let rgba = image.to_rgba8();
        self.width = rgba.width();
        self.height = rgba.height();
        self.pixels = Some(rgba.into_raw());
        Ok(())
    }
}

impl Asset for TextureAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Texture
    }

    fn state(&self) -> LoadState {
        self.state
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn load(&mut self, io: &FileSource) -> Result<(), AssetError> {
        self.state = LoadState::Loading;
        match self.decode(io) {
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

        let Some(pixels) = self.pixels.take() else {
            return Err(settle_failed(&mut self.state, &mut self.error, &self.name));
        };

        let desc = TextureDesc {
            label: self.name.clone(),
            width: self.width,
            height: self.height,
            format: self.options.format,
            filter: self.options.filter,
        };

        match ctx.device.create_texture(&desc, &pixels) {
            Ok(handle) => {
                log::debug!(
                    "Finalized texture '{}' ({}x{})",
                    self.name,
                    self.width,
                    self.height
                );
                self.handle = Some(handle);
                self.state = LoadState::Finalized;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = LoadState::Failed;
                Err(e.into())
            }
        }
    }

    fn release(&mut self, device: &mut dyn RenderDevice) -> Vec<DepKey> {
        if let Some(handle) = self.handle.take() {
            device.destroy_texture(handle);
        }
        self.pixels = None;
        self.state = LoadState::Released;
        Vec::new()
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
