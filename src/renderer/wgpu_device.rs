// wgpu-backed render device

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::{
    DrawCall, FilterMode, MeshId, MeshVertex, PixelFormat, RenderDevice, RenderError, ShaderId,
    TextureDesc, TextureId,
};

/// GPU texture with its view and sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// GPU mesh buffers
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Render device backed by a wgpu device and queue
///
/// Owns every resource created through it, keyed by handle. Draw calls are
/// recorded and encoded into a caller-provided render pass with
/// [`WgpuDevice::encode_draws`]; pipeline and bind group setup stay with the
/// caller, which can reach the underlying resources through the accessor
/// methods.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u64,
    textures: HashMap<u64, GpuTexture>,
    shaders: HashMap<u64, wgpu::ShaderModule>,
    meshes: HashMap<u64, GpuMesh>,
    draws: Vec<DrawCall>,
}

impl WgpuDevice {
    /// Wrap an existing device and queue
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next_id: 0,
            textures: HashMap::new(),
            shaders: HashMap::new(),
            meshes: HashMap::new(),
            draws: Vec::new(),
        }
    }

    /// Request a device without a surface, for offscreen use
    pub fn request_headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("kiln device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::DeviceRequest(e.to_string()))?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id.raw())
    }

    pub fn shader(&self, id: ShaderId) -> Option<&wgpu::ShaderModule> {
        self.shaders.get(&id.raw())
    }

    pub fn mesh(&self, id: MeshId) -> Option<&GpuMesh> {
        self.meshes.get(&id.raw())
    }

    /// Take the draws recorded since the last call, oldest first
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Encode draw calls into a render pass
    ///
    /// The pass must already have a compatible pipeline and bind groups set.
    /// Calls whose mesh has been destroyed since recording are skipped.
    pub fn encode_draws<'p>(&'p self, pass: &mut wgpu::RenderPass<'p>, calls: &[DrawCall]) {
        for call in calls {
            let Some(mesh) = self.meshes.get(&call.mesh.raw()) else {
                log::debug!("Skipping draw of destroyed mesh {}", call.mesh.raw());
                continue;
            };

            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            match &mesh.index_buffer {
                Some(indices) => {
                    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..call.instances);
                }
                None => {
                    pass.draw(0..mesh.vertex_count, 0..call.instances);
                }
            }
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

fn sampler_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

impl RenderDevice for WgpuDevice {
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, RenderError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::InvalidTexture(format!(
                "'{}' has zero extent ({}x{})",
                desc.label, desc.width, desc.height
            )));
        }
        if pixels.len() != desc.byte_size() {
            return Err(RenderError::InvalidTexture(format!(
                "'{}' expects {} bytes, got {}",
                desc.label,
                desc.byte_size(),
                pixels.len()
            )));
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let filter = sampler_filter(desc.filter);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let id = self.next();
        self.textures.insert(
            id,
            GpuTexture {
                texture,
                view,
                sampler,
                width: desc.width,
                height: desc.height,
            },
        );
        Ok(TextureId::new(id))
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if let Some(gpu) = self.textures.remove(&id.raw()) {
            gpu.texture.destroy();
        }
    }

    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, RenderError> {
        // create_shader_module reports validation failures out of band, so
        // catch them with an error scope instead of crashing later.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile(error.to_string()));
        }

        let id = self.next();
        self.shaders.insert(id, module);
        Ok(ShaderId::new(id))
    }

    fn destroy_shader(&mut self, id: ShaderId) {
        self.shaders.remove(&id.raw());
    }

    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[MeshVertex],
        indices: &[u32],
    ) -> Result<MeshId, RenderError> {
        if vertices.is_empty() {
            return Err(RenderError::InvalidMesh(format!("'{label}' has no vertices")));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::InvalidMesh(format!(
                "'{label}' index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = if indices.is_empty() {
            None
        } else {
            Some(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{label} indices")),
                        contents: bytemuck::cast_slice(indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
            )
        };

        let id = self.next();
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                vertex_count: vertices.len() as u32,
                index_count: indices.len() as u32,
            },
        );
        Ok(MeshId::new(id))
    }

    fn destroy_mesh(&mut self, id: MeshId) {
        self.meshes.remove(&id.raw());
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), RenderError> {
        if !self.meshes.contains_key(&call.mesh.raw()) {
            return Err(RenderError::UnknownHandle {
                kind: "mesh",
                id: call.mesh.raw(),
            });
        }
        self.draws.push(call);
        Ok(())
    }
}

// Exercising this backend needs a real adapter; the validation logic it
// shares with HeadlessDevice is covered by the headless tests.
