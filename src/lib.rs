//! Asset loading and resource management for real-time rendering.
//!
//! Assets go through a two-phase pipeline: a CPU load phase that may run on
//! the background worker thread, and a finalize phase that creates backend
//! resources and must run on the thread owning the render device. The
//! [`assets::AssetManager`] tracks every loaded asset by explicit reference
//! count and shares entries between requesters.

pub mod assets;
pub mod io;
pub mod renderer;

pub use assets::{AssetManager, LoadMode};
pub use io::FileSource;
pub use renderer::RenderDevice;
