// Raw file assets: arbitrary bytes loaded through the same pipeline

use crate::io::FileSource;
use crate::renderer::RenderDevice;

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::{AssetError, AssetKind, DepKey};

/// Unparsed file contents managed like any other asset
///
/// Useful for data the caller interprets itself (configuration, level
/// scripts, lookup tables) while still getting background loading, caching,
/// and reference counting. Unlike textures, the byte payload stays resident
/// after finalize; that is the whole point of the asset.
pub struct RawFileAsset {
    name: String,
    state: LoadState,
    error: Option<String>,
    data: Option<Vec<u8>>,
}

impl RawFileAsset {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LoadState::NotStarted,
            error: None,
            data: None,
        }
    }

    /// File contents, available once the asset is valid
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Contents interpreted as UTF-8 text
    pub fn text(&self) -> Option<&str> {
        self.data.as_deref().and_then(|d| std::str::from_utf8(d).ok())
    }
}

impl Asset for RawFileAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::File
    }

    fn state(&self) -> LoadState {
        self.state
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn load(&mut self, io: &FileSource) -> Result<(), AssetError> {
        self.state = LoadState::Loading;
        match io.load_file(&self.name) {
            Ok(bytes) => {
                self.data = Some(bytes);
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                let err = AssetError::from(e);
                self.error = Some(err.to_string());
                self.state = LoadState::Failed;
                Err(err)
            }
        }
    }

    fn finalize(&mut self, _ctx: &mut FinalizeContext<'_>) -> Result<(), AssetError> {
        match self.state {
            LoadState::Loaded => {
                self.state = LoadState::Finalized;
                Ok(())
            }
            LoadState::Finalized => Ok(()),
            _ => Err(settle_failed(&mut self.state, &mut self.error, &self.name)),
        }
    }

    fn release(&mut self, _device: &mut dyn RenderDevice) -> Vec<DepKey> {
        self.data = None;
        self.state = LoadState::Released;
        Vec::new()
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
