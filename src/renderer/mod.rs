// Graphics backend boundary
//
// Asset finalization talks to the GPU exclusively through the RenderDevice
// trait. Handles are opaque ids; the backend owns the actual resources and
// is free to represent them however it likes. Two implementations ship with
// the crate: WgpuDevice for real rendering and HeadlessDevice for tests and
// tooling that run without a GPU.

mod headless;
mod vertex;
mod wgpu_device;

pub use headless::HeadlessDevice;
pub use vertex::MeshVertex;
pub use wgpu_device::{GpuMesh, GpuTexture, WgpuDevice};

/// Opaque handle to a texture owned by a render device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

/// Opaque handle to a compiled shader owned by a render device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(u64);

/// Opaque handle to mesh geometry owned by a render device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

impl TextureId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value, stable for the lifetime of the resource
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl ShaderId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl MeshId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Pixel format for texture creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGBA, linear color space
    Rgba8,
    /// 8-bit RGBA, sRGB color space
    #[default]
    Rgba8Srgb,
}

/// Sampling filter for texture creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Everything a backend needs to create a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: FilterMode,
}

impl TextureDesc {
    /// Expected pixel payload size in bytes (both formats are 4 bytes per pixel)
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A single triangle-list draw
///
/// The mesh's own buffers decide whether the draw is indexed. Meshes without
/// an index buffer are drawn as plain vertex triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mesh: MeshId,
    pub instances: u32,
}

impl DrawCall {
    pub fn new(mesh: MeshId) -> Self {
        Self { mesh, instances: 1 }
    }
}

/// Render backend errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Unknown {kind} handle: {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("Invalid texture data: {0}")]
    InvalidTexture(String),

    #[error("Invalid mesh data: {0}")]
    InvalidMesh(String),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),
}

/// GPU resource management as seen by the asset pipeline
///
/// All methods run on the thread that owns the device; the background loader
/// never touches this trait. Destroy calls on handles that are already gone
/// are silently ignored so teardown paths do not have to track liveness.
pub trait RenderDevice {
    /// Upload a texture and return its handle. `pixels` must hold
    /// `desc.byte_size()` bytes of tightly packed RGBA data.
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, RenderError>;

    fn destroy_texture(&mut self, id: TextureId);

    /// Compile a WGSL shader module
    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, RenderError>;

    fn destroy_shader(&mut self, id: ShaderId);

    /// Upload mesh geometry. An empty `indices` slice creates a non-indexed
    /// mesh drawn as consecutive vertex triples.
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[MeshVertex],
        indices: &[u32],
    ) -> Result<MeshId, RenderError>;

    fn destroy_mesh(&mut self, id: MeshId);

    /// Record a triangle-list draw for the current frame
    fn draw(&mut self, call: DrawCall) -> Result<(), RenderError>;
}
