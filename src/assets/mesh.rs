// Mesh assets: triangle geometry in a compact binary container
//
// Container layout, all integers little-endian:
//
//   "KMSH"                     magic
//   u32 version                currently 1
//   u32 vertex count
//   u32 index count            0 means non-indexed triangle list
//   u32 material count
//   vertices                   vertex count * 32 bytes
//   indices                    index count * 4 bytes
//   materials                  per name: u16 length + UTF-8 bytes

use crate::io::FileSource;
use crate::renderer::{DrawCall, MeshId, MeshVertex, RenderDevice};

use super::asset::{settle_failed, Asset, LoadState};
use super::manager::FinalizeContext;
use super::{AssetError, AssetKind, DepKey, MaterialRef};

const MESH_MAGIC: &[u8; 4] = b"KMSH";
const MESH_VERSION: u32 = 1;

/// CPU-side geometry, dropped once uploaded
struct MeshGeometry {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

/// A mesh loaded from a binary container file
///
/// `load` parses and validates the container; `finalize` uploads the
/// geometry and acquires the referenced materials through the registry.
pub struct MeshAsset {
    name: String,
    state: LoadState,
    error: Option<String>,
    geometry: Option<MeshGeometry>,
    material_names: Vec<String>,
    vertex_count: u32,
    index_count: u32,
    handle: Option<MeshId>,
    materials: Vec<MaterialRef>,
    deps: Vec<DepKey>,
}

impl MeshAsset {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: LoadState::NotStarted,
            error: None,
            geometry: None,
            material_names: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            handle: None,
            materials: Vec::new(),
            deps: Vec::new(),
        }
    }

    pub fn handle(&self) -> Option<MeshId> {
        self.handle
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Material file names referenced by the container
    pub fn material_names(&self) -> &[String] {
        &self.material_names
    }

    /// Resolved materials, present once finalized
    pub fn materials(&self) -> &[MaterialRef] {
        &self.materials
    }

    /// Draw call for this mesh, once it is valid
    pub fn draw_call(&self) -> Option<DrawCall> {
        if self.is_valid() {
            self.handle.map(DrawCall::new)
        } else {
            None
        }
    }

    /// Serialize geometry into the container format
    ///
    /// The counterpart of `load`, used by bakers and tests to produce mesh
    /// files.
    pub fn encode(
        vertices: &[MeshVertex],
        indices: &[u32],
        materials: &[&str],
    ) -> Result<Vec<u8>, AssetError> {
        let vertex_count = u32::try_from(vertices.len()).map_err(|_| encode_error("too many vertices"))?;
        let index_count = u32::try_from(indices.len()).map_err(|_| encode_error("too many indices"))?;
        let material_count =
            u32::try_from(materials.len()).map_err(|_| encode_error("too many materials"))?;

        let mut out = Vec::with_capacity(20 + vertices.len() * 32 + indices.len() * 4);
        out.extend_from_slice(MESH_MAGIC);
        out.extend_from_slice(&MESH_VERSION.to_le_bytes());
        out.extend_from_slice(&vertex_count.to_le_bytes());
        out.extend_from_slice(&index_count.to_le_bytes());
        out.extend_from_slice(&material_count.to_le_bytes());
        out.extend_from_slice(bytemuck::cast_slice(vertices));
        out.extend_from_slice(bytemuck::cast_slice(indices));
        for material in materials {
            let len = u16::try_from(material.len())
                .map_err(|_| encode_error(&format!("material name '{material}' too long")))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(material.as_bytes());
        }
        Ok(out)
    }

    fn parse(&mut self, io: &FileSource) -> Result<(), AssetError> {
        let bytes = io.load_file(&self.name)?;
        let mut offset = 0usize;

        let magic = self.take(&bytes, &mut offset, 4)?;
        if magic != MESH_MAGIC {
            return Err(self.decode_error("bad magic, not a mesh container"));
        }
        let version = self.read_u32(&bytes, &mut offset)?;
        if version != MESH_VERSION {
            return Err(self.decode_error(&format!("unsupported container version {version}")));
        }

        let vertex_count = self.read_u32(&bytes, &mut offset)? as usize;
        let index_count = self.read_u32(&bytes, &mut offset)? as usize;
        let material_count = self.read_u32(&bytes, &mut offset)? as usize;

        if vertex_count == 0 {
            return Err(self.decode_error("mesh has no vertices"));
        }
        if index_count > 0 && index_count % 3 != 0 {
            return Err(self.decode_error(&format!(
                "index count {index_count} is not a multiple of 3"
            )));
        }
        if index_count == 0 && vertex_count % 3 != 0 {
            return Err(self.decode_error(&format!(
                "vertex count {vertex_count} is not a multiple of 3 for a non-indexed mesh"
            )));
        }

        let vertex_bytes = vertex_count
            .checked_mul(std::mem::size_of::<MeshVertex>())
            .ok_or_else(|| self.decode_error("vertex count overflows"))?;
        let raw_vertices = self.take(&bytes, &mut offset, vertex_bytes)?;
        let mut vertices = vec![MeshVertex::new([0.0; 3], [0.0; 3], [0.0; 2]); vertex_count];
        bytemuck::cast_slice_mut::<MeshVertex, u8>(&mut vertices).copy_from_slice(raw_vertices);

        let index_bytes = index_count
            .checked_mul(4)
            .ok_or_else(|| self.decode_error("index count overflows"))?;
        let raw_indices = self.take(&bytes, &mut offset, index_bytes)?;
        let mut indices = vec![0u32; index_count];
        bytemuck::cast_slice_mut::<u32, u8>(&mut indices).copy_from_slice(raw_indices);

        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(self.decode_error(&format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }

        let mut material_names = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let len = {
                let raw = self.take(&bytes, &mut offset, 2)?;
                u16::from_le_bytes([raw[0], raw[1]]) as usize
            };
            let raw_name = self.take(&bytes, &mut offset, len)?;
            let name = std::str::from_utf8(raw_name)
                .map_err(|_| self.decode_error("material name is not valid UTF-8"))?;
            material_names.push(name.to_string());
        }

        self.vertex_count = vertex_count as u32;
        self.index_count = index_count as u32;
        self.material_names = material_names;
        self.geometry = Some(MeshGeometry { vertices, indices });
        Ok(())
    }

    fn take<'b>(
        &self,
        bytes: &'b [u8],
        offset: &mut usize,
        len: usize,
    ) -> Result<&'b [u8], AssetError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| self.decode_error("container offset overflows"))?;
        let slice = bytes
            .get(*offset..end)
            .ok_or_else(|| self.decode_error("container is truncated"))?;
        *offset = end;
        Ok(slice)
    }

    fn read_u32(&self, bytes: &[u8], offset: &mut usize) -> Result<u32, AssetError> {
        let raw = self.take(bytes, offset, 4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn decode_error(&self, reason: &str) -> AssetError {
        AssetError::Decode {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

fn encode_error(reason: &str) -> AssetError {
    AssetError::Decode {
        name: "mesh encode".to_string(),
        reason: reason.to_string(),
    }
}

impl Asset for MeshAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Mesh
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

        let Some(geometry) = self.geometry.take() else {
            return Err(settle_failed(&mut self.state, &mut self.error, &self.name));
        };

        match ctx
            .device
            .create_mesh(&self.name, &geometry.vertices, &geometry.indices)
        {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = LoadState::Failed;
                return Err(e.into());
            }
        }

        let material_names = self.material_names.clone();
        for material_name in &material_names {
            match ctx.acquire_material(material_name) {
                Ok(material) => {
                    self.materials.push(material);
                    self.deps.push(DepKey::material(material_name));
                }
                Err(e) => {
                    self.error = Some(format!("material '{material_name}': {e}"));
                    self.state = LoadState::Failed;
                    return Err(e);
                }
            }
        }

        self.state = LoadState::Finalized;
        log::debug!(
            "Finalized mesh '{}' ({} vertices, {} indices, {} materials)",
            self.name,
            self.vertex_count,
            self.index_count,
            self.materials.len()
        );
        Ok(())
    }

    fn release(&mut self, device: &mut dyn RenderDevice) -> Vec<DepKey> {
        if let Some(handle) = self.handle.take() {
            device.destroy_mesh(handle);
        }
        self.geometry = None;
        self.materials.clear();
        self.state = LoadState::Released;
        std::mem::take(&mut self.deps)
    }

    fn mark_failed(&mut self, reason: String) {
        self.error = Some(reason);
        self.state = LoadState::Failed;
    }
}
