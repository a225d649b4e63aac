// Shader assets: WGSL source compiled into backend modules

use crate::io::FileSource;
use crate::renderer::{RenderDevice, ShaderId};

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::{AssetError, AssetKind, DepKey};

/// A shader loaded from a WGSL source file
pub struct ShaderAsset {
    name: String,
    state: LoadState,
    error: Option<String>,
    source: Option<String>,
    handle: Option<ShaderId>,
}

impl ShaderAsset {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LoadState::NotStarted,
            error: None,
            source: None,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<ShaderId> {
        self.handle
    }

    /// Source text, available from load until release
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn read_source(&mut self, io: &FileSource) -> Result<(), AssetError> {
        let bytes = io.load_file(&self.name)?;
        let source = String::from_utf8(bytes).map_err(|e| AssetError::Decode {
            name: self.name.clone(),
            reason: format!("not valid UTF-8: {e}"),
        })?;

        if source.trim().is_empty() {
            return Err(AssetError::Decode {
                name: self.name.clone(),
                reason: "shader source is empty".to_string(),
            });
        }

        self.source = Some(source);
        Ok(())
    }
}

impl Asset for ShaderAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Shader
    }

    fn state(&self) -> LoadState {
        self.state
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn load(&mut self, io: &FileSource) -> Result<(), AssetError> {
        self.state = LoadState::Loading;
        match self.read_source(io) {
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

        let Some(source) = self.source.as_deref() else {
            return Err(settle_failed(&mut self.state, &mut self.error, &self.name));
        };

        match ctx.device.create_shader(&self.name, source) {
            Ok(handle) => {
                log::debug!("Finalized shader '{}'", self.name);
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
            device.destroy_shader(handle);
        }
        self.source = None;
        self.state = LoadState::Released;
        Vec::new()
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
