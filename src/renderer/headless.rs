// GPU-free render device for tests and headless tooling

use std::collections::HashMap;

use super::{
    DrawCall, MeshId, MeshVertex, RenderDevice, RenderError, ShaderId, TextureDesc, TextureId,
};

/// Render device that tracks resources without touching a GPU
///
/// Validates inputs the same way the real backend would and keeps every live
/// handle in a map, so tests can assert exactly which resources exist after a
/// sequence of loads and unloads. Draws are recorded, not executed.
#[derive(Default)]
pub struct HeadlessDevice {
    next_id: u64,
    textures: HashMap<u64, TextureDesc>,
    shaders: HashMap<u64, String>,
    meshes: HashMap<u64, MeshInfo>,
    draws: Vec<DrawCall>,
    fail_creates: bool,
}

/// Geometry counts retained for a headless mesh
#[derive(Debug, Clone, Copy)]
pub struct MeshInfo {
    pub vertex_count: usize,
    pub index_count: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent create call fail, for exercising error paths
    pub fn set_fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    pub fn alive_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn alive_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn alive_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&id.raw())
    }

    pub fn shader_source(&self, id: ShaderId) -> Option<&str> {
        self.shaders.get(&id.raw()).map(|s| s.as_str())
    }

    pub fn mesh_info(&self, id: MeshId) -> Option<MeshInfo> {
        self.meshes.get(&id.raw()).copied()
    }

    /// Draws recorded since the last [`HeadlessDevice::clear_draws`]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId, RenderError> {
        if self.fail_creates {
            return Err(RenderError::InvalidTexture("create disabled".to_string()));
        }
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

        let id = self.next();
        self.textures.insert(id, desc.clone());
        Ok(TextureId::new(id))
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id.raw());
    }

    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, RenderError> {
        if self.fail_creates {
            return Err(RenderError::ShaderCompile("create disabled".to_string()));
        }
        if source.trim().is_empty() {
            return Err(RenderError::ShaderCompile(format!("'{label}' is empty")));
        }

        let id = self.next();
        self.shaders.insert(id, source.to_string());
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
        if self.fail_creates {
            return Err(RenderError::InvalidMesh("create disabled".to_string()));
        }
        if vertices.is_empty() {
            return Err(RenderError::InvalidMesh(format!("'{label}' has no vertices")));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::InvalidMesh(format!(
                "'{label}' index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let id = self.next();
        self.meshes.insert(
            id,
            MeshInfo {
                vertex_count: vertices.len(),
                index_count: indices.len(),
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
