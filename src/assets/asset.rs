// Asset lifecycle contract

use crate::io::FileSource;
use crate::renderer::RenderDevice;

use super::manager::FinalizeContext;
use super::{AssetError, AssetKind, DepKey};

/// Lifecycle stages of a managed asset
///
/// `NotStarted` covers both freshly registered placeholders and jobs still
/// sitting in the loader queue. `Released` marks an asset whose registry
/// entry is gone; outstanding references can observe it but never a live
/// backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    Loaded,
    Finalized,
    Failed,
    Released,
}

/// Behavior shared by every asset kind
///
/// The lifecycle splits into a CPU half and a GPU half: `load` runs file
/// reads and decoding and may execute on the background worker, `finalize`
/// creates backend handles and always runs on the thread that owns the
/// render device. `load` is normally called once per registration; the
/// manager may run it again for hot reload after `release`.
pub trait Asset: Send {
    /// Source file name this asset was registered with
    fn name(&self) -> &str;

    fn kind(&self) -> AssetKind;

    fn state(&self) -> LoadState;

    /// Message of the most recent failure, if any
    fn error(&self) -> Option<&str>;

    /// Read and decode the source data. No backend access permitted here.
    fn load(&mut self, io: &FileSource) -> Result<(), AssetError>;

    /// Create backend resources and resolve referenced assets
    ///
    /// Called after `load` regardless of its outcome. A failed load settles
    /// into [`LoadState::Failed`] here instead of panicking, and calling
    /// this again on an already finalized asset is a no-op.
    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) -> Result<(), AssetError>;

    /// Destroy backend resources and hand back references to other assets
    /// so the registry can drop them
    fn release(&mut self, device: &mut dyn RenderDevice) -> Vec<DepKey>;

    /// Force the asset into the failed state, e.g. when its load job could
    /// not be queued
    fn mark_failed(&mut self, reason: String);

    /// Whether the asset finished the full pipeline and is usable
    fn is_valid(&self) -> bool {
        self.state() == LoadState::Finalized
    }
}

/// Error for finalize calls that arrive with no loaded payload, either
/// because the load failed or because it never ran.
pub(crate) fn invalid_state_error(name: &str, error: Option<&str>) -> AssetError {
    match error {
        Some(e) => AssetError::LoadError(format!("{name}: {e}")),
        None => AssetError::LoadError(format!("{name}: no loaded data to finalize")),
    }
}

/// Settle an asset into the permanent failed state during finalize,
/// preserving the original load error when one was recorded.
pub(crate) fn settle_failed(
    state: &mut LoadState,
    error: &mut Option<String>,
    name: &str,
) -> AssetError {
    let err = invalid_state_error(name, error.as_deref());
    *state = LoadState::Failed;
    if error.is_none() {
        *error = Some(err.to_string());
    }
    err
}
