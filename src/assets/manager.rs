// Asset manager: reference-counted registry over the load pipeline
//
// One entry per registry key, shared out as Arc<Mutex<_>> handles. The
// explicit reference count decides destruction; outstanding Arcs only keep
// the memory alive, never the backend resources. All registry mutation
// happens on the thread that owns the manager, so the maps themselves need
// no locking.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::io::FileSource;
use crate::renderer::RenderDevice;

use super::asset::{Asset, LoadState};
use super::atlas::AtlasAsset;
use super::background::{BackgroundLoader, LoadJob};
use super::file::RawFileAsset;
use super::hot_reload::HotReloadWatcher;
use super::material::MaterialAsset;
use super::mesh::MeshAsset;
use super::shader::ShaderAsset;
use super::texture::{TextureAsset, TextureOptions};
use super::{
    AssetError, AssetKind, AtlasRef, DepKey, FileRef, LoadMode, LoadOptions, MaterialRef,
    MeshRef, ShaderRef, TextureRef,
};

struct Entry<A> {
    asset: Arc<Mutex<A>>,
    refs: usize,
}

/// Registry entries of one asset kind
pub(crate) struct Pool<A> {
    entries: HashMap<String, Entry<A>>,
}

impl<A> Pool<A> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Shared handle without touching the reference count
    fn find(&self, key: &str) -> Option<Arc<Mutex<A>>> {
        self.entries.get(key).map(|e| e.asset.clone())
    }

    /// Shared handle, counting one more reference
    fn acquire(&mut self, key: &str) -> Option<Arc<Mutex<A>>> {
        self.entries.get_mut(key).map(|e| {
            e.refs += 1;
            e.asset.clone()
        })
    }

    /// Register a new entry with one reference
    fn insert(&mut self, key: &str, asset: A) -> Arc<Mutex<A>> {
        let asset = Arc::new(Mutex::new(asset));
        self.entries.insert(
            key.to_string(),
            Entry {
                asset: asset.clone(),
                refs: 1,
            },
        );
        asset
    }

    /// Drop one reference; yields the entry when the count hits zero
    fn release(&mut self, key: &str) -> Option<Arc<Mutex<A>>> {
        let entry = self.entries.get_mut(key)?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            self.entries.remove(key).map(|e| e.asset)
        } else {
            None
        }
    }

    fn refs(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|e| e.refs)
    }

    /// True when `key` still maps to this exact shared object
    fn holds(&self, key: &str, asset: &Arc<Mutex<dyn Asset>>) -> bool {
        match self.entries.get(key) {
            Some(entry) => {
                Arc::as_ptr(&entry.asset) as *const () == Arc::as_ptr(asset) as *const ()
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn drain(&mut self) -> Vec<Arc<Mutex<A>>> {
        self.entries.drain().map(|(_, e)| e.asset).collect()
    }
}

/// The six typed pools behind the manager
pub(crate) struct AssetPools {
    shaders: Pool<ShaderAsset>,
    textures: Pool<TextureAsset>,
    atlases: Pool<AtlasAsset>,
    materials: Pool<MaterialAsset>,
    meshes: Pool<MeshAsset>,
    files: Pool<RawFileAsset>,
}

impl AssetPools {
    pub(crate) fn new() -> Self {
        Self {
            shaders: Pool::new(),
            textures: Pool::new(),
            atlases: Pool::new(),
            materials: Pool::new(),
            meshes: Pool::new(),
            files: Pool::new(),
        }
    }

    /// Find-or-load with the full pipeline run on the calling thread
    ///
    /// An existing entry is handed back as-is, whatever its state; this is
    /// what makes dependency cycles and mid-flight references safe, since no
    /// lock is taken on entries that already exist.
    fn blocking_load<A, F, G>(
        &mut self,
        device: &mut dyn RenderDevice,
        io: &FileSource,
        key: &str,
        make: F,
        pool: G,
    ) -> Result<Arc<Mutex<A>>, AssetError>
    where
        A: Asset,
        F: FnOnce() -> A,
        G: Fn(&mut AssetPools) -> &mut Pool<A>,
    {
        if let Some(existing) = pool(self).acquire(key) {
            return Ok(existing);
        }

        let arc = pool(self).insert(key, make());
        let result = {
            let mut asset = arc.lock();
            asset.load(io).and_then(|()| {
                let mut ctx = FinalizeContext {
                    device,
                    assets: self,
                    io,
                };
                asset.finalize(&mut ctx)
            })
        };

        // On failure the entry stays registered in its failed state, so
        // repeat requests coalesce onto it instead of re-running the load.
        result.map(|()| arc)
    }

    fn release_one(&mut self, device: &mut dyn RenderDevice, dep: &DepKey) {
        match dep.kind {
            AssetKind::Shader => self.unload_in(device, &dep.key, |p| &mut p.shaders),
            AssetKind::Texture => self.unload_in(device, &dep.key, |p| &mut p.textures),
            AssetKind::Atlas => self.unload_in(device, &dep.key, |p| &mut p.atlases),
            AssetKind::Material => self.unload_in(device, &dep.key, |p| &mut p.materials),
            AssetKind::Mesh => self.unload_in(device, &dep.key, |p| &mut p.meshes),
            AssetKind::File => self.unload_in(device, &dep.key, |p| &mut p.files),
        }
    }

    fn release_deps(&mut self, device: &mut dyn RenderDevice, deps: Vec<DepKey>) {
        for dep in deps {
            self.release_one(device, &dep);
        }
    }

    /// True when the pool for `kind` still maps `key` to this exact object
    fn holds(&self, kind: AssetKind, key: &str, asset: &Arc<Mutex<dyn Asset>>) -> bool {
        match kind {
            AssetKind::Shader => self.shaders.holds(key, asset),
            AssetKind::Texture => self.textures.holds(key, asset),
            AssetKind::Atlas => self.atlases.holds(key, asset),
            AssetKind::Material => self.materials.holds(key, asset),
            AssetKind::Mesh => self.meshes.holds(key, asset),
            AssetKind::File => self.files.holds(key, asset),
        }
    }

    fn unload_in<A, G>(&mut self, device: &mut dyn RenderDevice, key: &str, pool: G)
    where
        A: Asset,
        G: Fn(&mut AssetPools) -> &mut Pool<A>,
    {
        if pool(self).refs(key).is_none() {
            log::debug!("Unload of unknown asset '{key}' ignored");
            return;
        }

        if let Some(arc) = pool(self).release(key) {
            let deps = arc.lock().release(device);
            log::debug!("Destroyed asset '{key}'");
            self.release_deps(device, deps);
        }
    }

    fn reload_in<A, G>(
        &mut self,
        device: &mut dyn RenderDevice,
        io: &FileSource,
        key: &str,
        pool: G,
    ) -> bool
    where
        A: Asset,
        G: Fn(&mut AssetPools) -> &mut Pool<A>,
    {
        let Some(arc) = pool(self).find(key) else {
            return false;
        };

        // Entries still moving through the pipeline are left alone; the
        // watcher will report the file again on a later poll if needed.
        let state = arc.lock().state();
        if !matches!(state, LoadState::Finalized | LoadState::Failed) {
            return false;
        }

        let deps = arc.lock().release(device);
        self.release_deps(device, deps);

        let result = {
            let mut asset = arc.lock();
            asset.load(io).and_then(|()| {
                let mut ctx = FinalizeContext {
                    device,
                    assets: self,
                    io,
                };
                asset.finalize(&mut ctx)
            })
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Hot reload of '{key}' failed: {e}");
                false
            }
        }
    }

    fn clear(&mut self, device: &mut dyn RenderDevice) {
        // Everything is going away, so cascading releases are pointless;
        // destroy handles directly, referencers first for tidy logs.
        for arc in self.meshes.drain() {
            arc.lock().release(device);
        }
        for arc in self.materials.drain() {
            arc.lock().release(device);
        }
        for arc in self.atlases.drain() {
            arc.lock().release(device);
        }
        for arc in self.textures.drain() {
            arc.lock().release(device);
        }
        for arc in self.shaders.drain() {
            arc.lock().release(device);
        }
        for arc in self.files.drain() {
            arc.lock().release(device);
        }
    }
}

/// Resources available while an asset finalizes
///
/// Grants backend access plus registry lookups, so assets can resolve the
/// things they reference. Acquired references are counted against the
/// acquiring asset and must be returned from its `release`.
pub struct FinalizeContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    pub(crate) assets: &'a mut AssetPools,
    pub(crate) io: &'a FileSource,
}

impl FinalizeContext<'_> {
    pub fn io(&self) -> &FileSource {
        self.io
    }

    /// Reference a texture, loading it on this thread if it is not
    /// registered yet
    pub fn acquire_texture(
        &mut self,
        name: &str,
        options: TextureOptions,
    ) -> Result<TextureRef, AssetError> {
        let key = options.alias.clone().unwrap_or_else(|| name.to_string());
        self.assets.blocking_load(
            &mut *self.device,
            self.io,
            &key,
            || TextureAsset::new(name, options),
            |p| &mut p.textures,
        )
    }

    /// Reference a shader, loading it on this thread if needed
    pub fn acquire_shader(&mut self, name: &str) -> Result<ShaderRef, AssetError> {
        self.assets.blocking_load(
            &mut *self.device,
            self.io,
            name,
            || ShaderAsset::new(name),
            |p| &mut p.shaders,
        )
    }

    /// Reference a material, loading it on this thread if needed
    pub fn acquire_material(&mut self, name: &str) -> Result<MaterialRef, AssetError> {
        self.assets.blocking_load(
            &mut *self.device,
            self.io,
            name,
            || MaterialAsset::new(name),
            |p| &mut p.materials,
        )
    }
}

/// Registry entry counts plus load queue depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub shaders: usize,
    pub textures: usize,
    pub atlases: usize,
    pub materials: usize,
    pub meshes: usize,
    pub files: usize,
    pub pending_jobs: usize,
}

impl RegistryStats {
    /// Registered entries across all pools
    pub fn total(&self) -> usize {
        self.shaders + self.textures + self.atlases + self.materials + self.meshes + self.files
    }
}

/// Central owner of all loaded assets
///
/// Loads run either on the calling thread (`LoadMode::Blocking`) or through
/// the background worker (`LoadMode::Background`), in which case
/// [`AssetManager::try_finalize`] must be pumped from the thread that owns
/// the render device. Failures never panic: the failing entry stays
/// registered in an invalid state and the message is kept for
/// [`AssetManager::last_error`].
pub struct AssetManager {
    io: Arc<FileSource>,
    loader: BackgroundLoader,
    pools: AssetPools,
    watcher: Option<HotReloadWatcher>,
    last_error: Option<String>,
}

impl AssetManager {
    pub fn new(io: FileSource) -> Self {
        Self::with_hot_reload(io, false)
    }

    /// Create a manager, optionally watching loaded files for changes
    pub fn with_hot_reload(io: FileSource, hot_reload: bool) -> Self {
        let io = Arc::new(io);
        let loader = BackgroundLoader::spawn(io.clone());
        log::info!(
            "Asset manager ready (base path '{}', hot reload {})",
            io.base_path().display(),
            if hot_reload { "on" } else { "off" }
        );

        Self {
            loader,
            pools: AssetPools::new(),
            watcher: hot_reload.then(HotReloadWatcher::new),
            last_error: None,
            io,
        }
    }

    pub fn file_source(&self) -> &FileSource {
        &self.io
    }

    /// Message of the most recent pipeline failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn loader_running(&self) -> bool {
        self.loader.is_running()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            shaders: self.pools.shaders.len(),
            textures: self.pools.textures.len(),
            atlases: self.pools.atlases.len(),
            materials: self.pools.materials.len(),
            meshes: self.pools.meshes.len(),
            files: self.pools.files.len(),
            pending_jobs: self.loader.pending(),
        }
    }

    /// Current reference count of a registry entry
    pub fn ref_count(&self, kind: AssetKind, name: &str) -> Option<usize> {
        match kind {
            AssetKind::Shader => self.pools.shaders.refs(name),
            AssetKind::Texture => self.pools.textures.refs(name),
            AssetKind::Atlas => self.pools.atlases.refs(name),
            AssetKind::Material => self.pools.materials.refs(name),
            AssetKind::Mesh => self.pools.meshes.refs(name),
            AssetKind::File => self.pools.files.refs(name),
        }
    }

    // Lookups never touch reference counts.

    pub fn find_shader(&self, name: &str) -> Option<ShaderRef> {
        self.pools.shaders.find(name)
    }

    pub fn find_texture(&self, name: &str) -> Option<TextureRef> {
        self.pools.textures.find(name)
    }

    pub fn find_atlas(&self, name: &str) -> Option<AtlasRef> {
        self.pools.atlases.find(name)
    }

    pub fn find_material(&self, name: &str) -> Option<MaterialRef> {
        self.pools.materials.find(name)
    }

    pub fn find_mesh(&self, name: &str) -> Option<MeshRef> {
        self.pools.meshes.find(name)
    }

    pub fn find_file(&self, name: &str) -> Option<FileRef> {
        self.pools.files.find(name)
    }

    /// Load a shader from a WGSL file
    pub fn load_shader(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: LoadOptions,
        mode: LoadMode,
    ) -> Result<ShaderRef, AssetError> {
        let key = options.alias.unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.shaders.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || ShaderAsset::new(name),
                    |p| &mut p.shaders,
                );
                self.finish_blocking(AssetKind::Shader, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self.pools.shaders.insert(&key, ShaderAsset::new(name));
                self.enqueue(AssetKind::Shader, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    /// Load a texture from an image file
    pub fn load_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: TextureOptions,
        mode: LoadMode,
    ) -> Result<TextureRef, AssetError> {
        let key = options.alias.clone().unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.textures.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || TextureAsset::new(name, options),
                    |p| &mut p.textures,
                );
                self.finish_blocking(AssetKind::Texture, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self
                    .pools
                    .textures
                    .insert(&key, TextureAsset::new(name, options));
                self.enqueue(AssetKind::Texture, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    /// Load a texture atlas from a JSON descriptor
    pub fn load_atlas(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: LoadOptions,
        mode: LoadMode,
    ) -> Result<AtlasRef, AssetError> {
        let key = options.alias.unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.atlases.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || AtlasAsset::new(name),
                    |p| &mut p.atlases,
                );
                self.finish_blocking(AssetKind::Atlas, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self.pools.atlases.insert(&key, AtlasAsset::new(name));
                self.enqueue(AssetKind::Atlas, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    /// Load a material from a JSON descriptor
    pub fn load_material(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: LoadOptions,
        mode: LoadMode,
    ) -> Result<MaterialRef, AssetError> {
        let key = options.alias.unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.materials.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || MaterialAsset::new(name),
                    |p| &mut p.materials,
                );
                self.finish_blocking(AssetKind::Material, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self.pools.materials.insert(&key, MaterialAsset::new(name));
                self.enqueue(AssetKind::Material, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    /// Load a mesh from a binary container
    pub fn load_mesh(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: LoadOptions,
        mode: LoadMode,
    ) -> Result<MeshRef, AssetError> {
        let key = options.alias.unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.meshes.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || MeshAsset::new(name),
                    |p| &mut p.meshes,
                );
                self.finish_blocking(AssetKind::Mesh, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self.pools.meshes.insert(&key, MeshAsset::new(name));
                self.enqueue(AssetKind::Mesh, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    /// Load a file's raw bytes through the asset pipeline
    pub fn load_file(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        options: LoadOptions,
        mode: LoadMode,
    ) -> Result<FileRef, AssetError> {
        let key = options.alias.unwrap_or_else(|| name.to_string());
        if let Some(existing) = self.pools.files.acquire(&key) {
            return Ok(existing);
        }

        match mode {
            LoadMode::Blocking => {
                let loaded = self.pools.blocking_load(
                    device,
                    &self.io,
                    &key,
                    || RawFileAsset::new(name),
                    |p| &mut p.files,
                );
                self.finish_blocking(AssetKind::File, name, &key, loaded)
            }
            LoadMode::Background => {
                let asset = self.pools.files.insert(&key, RawFileAsset::new(name));
                self.enqueue(AssetKind::File, &key, name, asset.clone());
                Ok(asset)
            }
        }
    }

    pub fn unload_shader(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::Shader, name));
    }

    pub fn unload_texture(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::Texture, name));
    }

    pub fn unload_atlas(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::Atlas, name));
    }

    pub fn unload_material(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::Material, name));
    }

    pub fn unload_mesh(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::Mesh, name));
    }

    pub fn unload_file(&mut self, device: &mut dyn RenderDevice, name: &str) {
        self.pools
            .release_one(device, &DepKey::new(AssetKind::File, name));
    }

    /// Finalize completed background loads without blocking
    ///
    /// Call from the thread that owns the render device, typically once per
    /// frame. Completions are processed in the order they were queued.
    /// Returns true when every queued job has been finalized, so shutdown
    /// code can pump it until quiescent. With nothing in flight this is a
    /// cheap no-op that returns true.
    pub fn try_finalize(&mut self, device: &mut dyn RenderDevice) -> bool {
        for job in self.loader.drain_completed() {
            // The entry may have been unloaded, or replaced under the same
            // key, while the job was in flight. Finalizing would create a
            // backend handle no pool owns, so release the object and drop
            // the job instead.
            if !self.pools.holds(job.kind, &job.key, &job.asset) {
                let deps = job.asset.lock().release(device);
                self.pools.release_deps(device, deps);
                self.loader.mark_finalized();
                log::debug!("Dropped stale {} job for '{}'", job.kind, job.key);
                continue;
            }

            let result = {
                let mut asset = job.asset.lock();
                let mut ctx = FinalizeContext {
                    device: &mut *device,
                    assets: &mut self.pools,
                    io: &self.io,
                };
                asset.finalize(&mut ctx)
            };
            self.loader.mark_finalized();

            match result {
                Ok(()) => self.watch(job.kind, &job.name, &job.key),
                Err(e) => {
                    log::error!("Finalize of '{}' failed: {e}", job.key);
                    self.last_error = Some(e.to_string());
                }
            }
        }

        self.loader.idle()
    }

    /// Reload watched assets whose source files changed on disk
    ///
    /// Returns the registry keys that were reloaded. Does nothing unless the
    /// manager was created with hot reload enabled.
    pub fn poll_hot_reload(&mut self, device: &mut dyn RenderDevice) -> Vec<String> {
        let changed = match &mut self.watcher {
            Some(watcher) => watcher.poll_changed(),
            None => return Vec::new(),
        };

        let mut reloaded = Vec::new();
        for change in changed {
            let ok = match change.kind {
                AssetKind::Shader => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.shaders)
                }
                AssetKind::Texture => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.textures)
                }
                AssetKind::Atlas => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.atlases)
                }
                AssetKind::Material => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.materials)
                }
                AssetKind::Mesh => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.meshes)
                }
                AssetKind::File => {
                    self.pools
                        .reload_in(device, &self.io, &change.key, |p| &mut p.files)
                }
            };

            if ok {
                log::info!("Hot reloaded '{}'", change.key);
                reloaded.push(change.key);
            }
        }
        reloaded
    }

    /// Stop the loader and destroy every asset regardless of reference counts
    ///
    /// Blocks until the worker has quiesced; jobs that never started are
    /// dropped. The loader stays stopped afterwards, so later background
    /// requests fail fast while blocking loads keep working. Call this
    /// before dropping the manager so backend handles are destroyed.
    pub fn clear_all(&mut self, device: &mut dyn RenderDevice) {
        self.loader.stop();
        // Completed jobs point at entries that are about to be destroyed
        let _ = self.loader.drain_completed();

        self.pools.clear(device);
        if let Some(watcher) = &mut self.watcher {
            watcher.clear();
        }
        log::info!("Cleared all assets");
    }

    fn finish_blocking<A>(
        &mut self,
        kind: AssetKind,
        name: &str,
        key: &str,
        result: Result<Arc<Mutex<A>>, AssetError>,
    ) -> Result<Arc<Mutex<A>>, AssetError> {
        match result {
            Ok(asset) => {
                self.watch(kind, name, key);
                Ok(asset)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn enqueue(&mut self, kind: AssetKind, key: &str, name: &str, asset: Arc<Mutex<dyn Asset>>) {
        log::debug!("Requesting background {kind} load of '{key}'");
        let job = LoadJob::new(kind, key, name, asset.clone());
        if let Err(e) = self.loader.queue(job) {
            asset.lock().mark_failed(e.to_string());
            self.record_error(&e);
        }
    }

    fn watch(&mut self, kind: AssetKind, name: &str, key: &str) {
        if let Some(watcher) = &mut self.watcher {
            let path = self.io.resolve(name);
            watcher.track(path, kind, key);
        }
    }

    fn record_error(&mut self, e: &AssetError) {
        log::error!("{e}");
        self.last_error = Some(e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessDevice;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    const WGSL: &str = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, image::ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn memory_manager(files: Vec<(&str, Vec<u8>)>) -> AssetManager {
        init_logs();
        let map: HashMap<PathBuf, Vec<u8>> = files
            .into_iter()
            .map(|(name, bytes)| (Path::new("mem").join(name), bytes))
            .collect();
        let io = FileSource::new("mem").with_reader(Arc::new(move |path: &Path| {
            map.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "not in memory source")
            })
        }));
        AssetManager::new(io)
    }

    fn drive(manager: &mut AssetManager, device: &mut HeadlessDevice) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !manager.try_finalize(device) {
            assert!(Instant::now() < deadline, "loader did not quiesce in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_blocking_texture_load() {
        let mut manager = memory_manager(vec![("hero.png", png_bytes(4, 4))]);
        let mut device = HeadlessDevice::new();

        let texture = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(texture.lock().is_valid());
        assert_eq!(device.alive_textures(), 1);
        assert!(manager.find_texture("hero.png").is_some());
        assert_eq!(manager.ref_count(AssetKind::Texture, "hero.png"), Some(1));
    }

    #[test]
    fn test_duplicate_load_shares_entry() {
        let mut manager = memory_manager(vec![("hero.png", png_bytes(2, 2))]);
        let mut device = HeadlessDevice::new();

        let first = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        let second = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.stats().textures, 1);
        assert_eq!(manager.ref_count(AssetKind::Texture, "hero.png"), Some(2));
        assert_eq!(device.alive_textures(), 1);
    }

    #[test]
    fn test_unload_ref_counting() {
        let mut manager = memory_manager(vec![("basic.wgsl", WGSL.as_bytes().to_vec())]);
        let mut device = HeadlessDevice::new();

        // Two loads, so destruction takes two unloads
        for _ in 0..2 {
            manager
                .load_shader(
                    &mut device,
                    "basic.wgsl",
                    LoadOptions::default(),
                    LoadMode::Blocking,
                )
                .unwrap();
        }

        manager.unload_shader(&mut device, "basic.wgsl");
        assert!(manager.find_shader("basic.wgsl").is_some());
        assert_eq!(device.alive_shaders(), 1);

        manager.unload_shader(&mut device, "basic.wgsl");
        assert!(manager.find_shader("basic.wgsl").is_none());
        assert_eq!(device.alive_shaders(), 0);
    }

    #[test]
    fn test_unload_unknown_is_silent() {
        let mut manager = memory_manager(vec![]);
        let mut device = HeadlessDevice::new();
        manager.unload_texture(&mut device, "never-loaded.png");
        assert_eq!(manager.stats().total(), 0);
    }

    #[test]
    fn test_failed_blocking_load_keeps_entry() {
        let mut manager = memory_manager(vec![]);
        let mut device = HeadlessDevice::new();

        let result = manager.load_texture(
            &mut device,
            "missing.png",
            TextureOptions::default(),
            LoadMode::Blocking,
        );
        assert!(matches!(result, Err(AssetError::File(_))));
        assert!(manager.last_error().is_some());

        // The failed entry stays registered so repeat requests coalesce
        let entry = manager.find_texture("missing.png").unwrap();
        assert_eq!(entry.lock().state(), LoadState::Failed);
        assert!(!entry.lock().is_valid());

        let again = manager
            .load_texture(
                &mut device,
                "missing.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        assert!(Arc::ptr_eq(&entry, &again));
        assert_eq!(manager.ref_count(AssetKind::Texture, "missing.png"), Some(2));
        assert_eq!(device.alive_textures(), 0);
    }

    #[test]
    fn test_alias_keys_registry() {
        let mut manager = memory_manager(vec![("textures/hero.png", png_bytes(2, 2))]);
        let mut device = HeadlessDevice::new();

        manager
            .load_texture(
                &mut device,
                "textures/hero.png",
                TextureOptions::aliased("hero"),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(manager.find_texture("hero").is_some());
        assert!(manager.find_texture("textures/hero.png").is_none());
    }

    #[test]
    fn test_material_resolves_and_cascades() {
        let material_json =
            r#"{"shader": "lit.wgsl", "textures": ["rock.png"], "params": {"roughness": 0.5}}"#;
        let mut manager = memory_manager(vec![
            ("rock.material.json", material_json.as_bytes().to_vec()),
            ("lit.wgsl", WGSL.as_bytes().to_vec()),
            ("rock.png", png_bytes(2, 2)),
        ]);
        let mut device = HeadlessDevice::new();

        let material = manager
            .load_material(
                &mut device,
                "rock.material.json",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(material.lock().is_valid());
        assert_eq!(material.lock().param("roughness"), Some(0.5));
        assert_eq!(manager.ref_count(AssetKind::Shader, "lit.wgsl"), Some(1));
        assert_eq!(manager.ref_count(AssetKind::Texture, "rock.png"), Some(1));
        assert_eq!(device.alive_shaders(), 1);
        assert_eq!(device.alive_textures(), 1);

        manager.unload_material(&mut device, "rock.material.json");
        assert_eq!(manager.stats().total(), 0);
        assert_eq!(device.alive_shaders(), 0);
        assert_eq!(device.alive_textures(), 0);
    }

    #[test]
    fn test_atlas_resolves_texture_and_cascades() {
        let atlas_json = r#"{
            "texture": "sheet.png",
            "width": 32,
            "height": 32,
            "regions": [{"name": "idle", "x": 0, "y": 0, "width": 16, "height": 16}]
        }"#;
        let mut manager = memory_manager(vec![
            ("sheet.atlas.json", atlas_json.as_bytes().to_vec()),
            ("sheet.png", png_bytes(2, 2)),
        ]);
        let mut device = HeadlessDevice::new();

        let atlas = manager
            .load_atlas(
                &mut device,
                "sheet.atlas.json",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(atlas.lock().is_valid());
        assert!(atlas.lock().region("idle").is_some());
        assert_eq!(manager.ref_count(AssetKind::Texture, "sheet.png"), Some(1));
        assert_eq!(device.alive_textures(), 1);

        manager.unload_atlas(&mut device, "sheet.atlas.json");
        assert_eq!(manager.stats().total(), 0);
        assert_eq!(device.alive_textures(), 0);
    }

    #[test]
    fn test_shared_dependency_outlives_first_owner() {
        let rock = r#"{"shader": "lit.wgsl", "textures": []}"#;
        let moss = r#"{"shader": "lit.wgsl", "textures": []}"#;
        let mut manager = memory_manager(vec![
            ("rock.material.json", rock.as_bytes().to_vec()),
            ("moss.material.json", moss.as_bytes().to_vec()),
            ("lit.wgsl", WGSL.as_bytes().to_vec()),
        ]);
        let mut device = HeadlessDevice::new();

        for name in ["rock.material.json", "moss.material.json"] {
            manager
                .load_material(&mut device, name, LoadOptions::default(), LoadMode::Blocking)
                .unwrap();
        }
        assert_eq!(manager.ref_count(AssetKind::Shader, "lit.wgsl"), Some(2));

        manager.unload_material(&mut device, "rock.material.json");
        assert_eq!(manager.ref_count(AssetKind::Shader, "lit.wgsl"), Some(1));
        assert_eq!(device.alive_shaders(), 1);

        manager.unload_material(&mut device, "moss.material.json");
        assert_eq!(device.alive_shaders(), 0);
    }

    #[test]
    fn test_mesh_resolves_material_chain() {
        let material_json = r#"{"shader": "lit.wgsl", "textures": ["rock.png"]}"#;
        let mesh_bytes = MeshAsset::encode(
            &[
                crate::renderer::MeshVertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0, 0.0]),
                crate::renderer::MeshVertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                crate::renderer::MeshVertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            &[0, 1, 2],
            &["rock.material.json"],
        )
        .unwrap();

        let mut manager = memory_manager(vec![
            ("rock.kmsh", mesh_bytes),
            ("rock.material.json", material_json.as_bytes().to_vec()),
            ("lit.wgsl", WGSL.as_bytes().to_vec()),
            ("rock.png", png_bytes(2, 2)),
        ]);
        let mut device = HeadlessDevice::new();

        let mesh = manager
            .load_mesh(
                &mut device,
                "rock.kmsh",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(mesh.lock().is_valid());
        assert!(mesh.lock().draw_call().is_some());
        assert_eq!(manager.stats().total(), 4);
        assert_eq!(device.alive_meshes(), 1);

        manager.unload_mesh(&mut device, "rock.kmsh");
        assert_eq!(manager.stats().total(), 0);
        assert_eq!(device.alive_meshes(), 0);
        assert_eq!(device.alive_textures(), 0);
        assert_eq!(device.alive_shaders(), 0);
    }

    #[test]
    fn test_background_load_roundtrip() {
        let mut manager = memory_manager(vec![("hero.png", png_bytes(4, 4))]);
        let mut device = HeadlessDevice::new();

        let texture = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();

        // The placeholder is registered immediately and not yet usable
        assert!(manager.find_texture("hero.png").is_some());
        assert!(!texture.lock().is_valid());

        drive(&mut manager, &mut device);

        assert!(texture.lock().is_valid());
        assert_eq!(device.alive_textures(), 1);
        assert_eq!(manager.stats().pending_jobs, 0);
    }

    #[test]
    fn test_background_failure_sets_last_error() {
        let mut manager = memory_manager(vec![]);
        let mut device = HeadlessDevice::new();

        let texture = manager
            .load_texture(
                &mut device,
                "ghost.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();

        drive(&mut manager, &mut device);

        assert_eq!(texture.lock().state(), LoadState::Failed);
        assert!(texture.lock().error().is_some());
        assert!(manager.last_error().is_some());
        // Failed entries stay registered
        assert!(manager.find_texture("ghost.png").is_some());
    }

    #[test]
    fn test_background_duplicate_coalesces() {
        let mut manager = memory_manager(vec![("hero.png", png_bytes(2, 2))]);
        let mut device = HeadlessDevice::new();

        let first = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();
        let second = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.ref_count(AssetKind::Texture, "hero.png"), Some(2));
        assert_eq!(manager.stats().textures, 1);

        drive(&mut manager, &mut device);
        assert_eq!(device.alive_textures(), 1);
    }

    #[test]
    fn test_unload_during_background_load_creates_no_handle() {
        init_logs();
        let map: HashMap<PathBuf, Vec<u8>> = vec![
            ("slow.png", png_bytes(2, 2)),
            ("victim.png", png_bytes(2, 2)),
        ]
        .into_iter()
        .map(|(name, bytes)| (Path::new("mem").join(name), bytes))
        .collect();
        // Stall the first job so the second is still queued when it gets
        // unloaded and replaced.
        let io = FileSource::new("mem").with_reader(Arc::new(move |path: &Path| {
            if path.ends_with("slow.png") {
                std::thread::sleep(Duration::from_millis(150));
            }
            map.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "not in memory source")
            })
        }));
        let mut manager = AssetManager::new(io);
        let mut device = HeadlessDevice::new();

        manager
            .load_texture(
                &mut device,
                "slow.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();
        manager
            .load_texture(
                &mut device,
                "victim.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();

        manager.unload_texture(&mut device, "victim.png");
        assert!(manager.find_texture("victim.png").is_none());

        // Same key, different object; the stale job must not finalize onto it
        let replacement = manager
            .load_texture(
                &mut device,
                "victim.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        assert!(replacement.lock().is_valid());

        drive(&mut manager, &mut device);

        assert_eq!(device.alive_textures(), 2);
        assert_eq!(manager.stats().textures, 2);
        assert_eq!(manager.ref_count(AssetKind::Texture, "victim.png"), Some(1));
        assert!(manager.last_error().is_none());

        manager.clear_all(&mut device);
        assert_eq!(device.alive_textures(), 0);
    }

    #[test]
    fn test_unload_before_finalize_records_no_error() {
        let mut manager = memory_manager(vec![("hero.png", png_bytes(2, 2))]);
        let mut device = HeadlessDevice::new();

        let texture = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();

        // Wait for the worker to finish the CPU step before unloading
        let deadline = Instant::now() + Duration::from_secs(5);
        while texture.lock().state() != LoadState::Loaded {
            assert!(Instant::now() < deadline, "load did not complete in time");
            std::thread::sleep(Duration::from_millis(1));
        }

        manager.unload_texture(&mut device, "hero.png");
        drive(&mut manager, &mut device);

        assert_eq!(device.alive_textures(), 0);
        assert_eq!(manager.stats().textures, 0);
        assert!(manager.last_error().is_none());
        assert_eq!(texture.lock().state(), LoadState::Released);
    }

    #[test]
    fn test_try_finalize_idle_is_noop() {
        let mut manager = memory_manager(vec![]);
        let mut device = HeadlessDevice::new();
        assert!(manager.try_finalize(&mut device));
        assert!(manager.try_finalize(&mut device));
    }

    #[test]
    fn test_clear_all_stops_loader_and_empties() {
        let mut manager = memory_manager(vec![
            ("hero.png", png_bytes(2, 2)),
            ("basic.wgsl", WGSL.as_bytes().to_vec()),
        ]);
        let mut device = HeadlessDevice::new();

        manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        manager.clear_all(&mut device);

        assert_eq!(manager.stats().total(), 0);
        assert_eq!(device.alive_textures(), 0);
        assert!(!manager.loader_running());

        // Background requests now fail fast...
        let orphan = manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Background,
            )
            .unwrap();
        assert_eq!(orphan.lock().state(), LoadState::Failed);
        assert!(manager.last_error().is_some());

        // ...while blocking loads still work
        manager.unload_texture(&mut device, "hero.png");
        let shader = manager
            .load_shader(
                &mut device,
                "basic.wgsl",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        assert!(shader.lock().is_valid());
    }

    #[test]
    fn test_stats_counts() {
        let mut manager = memory_manager(vec![
            ("hero.png", png_bytes(2, 2)),
            ("notes.txt", b"hello".to_vec()),
        ]);
        let mut device = HeadlessDevice::new();

        manager
            .load_texture(
                &mut device,
                "hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();
        manager
            .load_file(
                &mut device,
                "notes.txt",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.textures, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.pending_jobs, 0);
    }

    // Disk-backed tests below exercise the default read path and the
    // mtime-based hot reload flow.

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn bump_mtime(dir: &Path, name: &str, forward: Duration) {
        let file = std::fs::File::options()
            .write(true)
            .open(dir.join(name))
            .unwrap();
        file.set_modified(std::time::SystemTime::now() + forward)
            .unwrap();
    }

    #[test]
    fn test_disk_blocking_texture() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "sprites/hero.png", &png_bytes(8, 8));

        let mut manager = AssetManager::new(FileSource::new(dir.path()));
        let mut device = HeadlessDevice::new();

        let texture = manager
            .load_texture(
                &mut device,
                "sprites/hero.png",
                TextureOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        assert!(texture.lock().is_valid());
        assert_eq!(texture.lock().dimensions(), (8, 8));
    }

    #[test]
    fn test_disk_mesh_chain_background() -> anyhow::Result<()> {
        let material_json = r#"{"shader": "lit.wgsl", "textures": ["rock.png"]}"#;
        let mesh_bytes = MeshAsset::encode(
            &[
                crate::renderer::MeshVertex::new([0.0; 3], [0.0, 0.0, 1.0], [0.0, 0.0]),
                crate::renderer::MeshVertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                crate::renderer::MeshVertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            &[0, 1, 2],
            &["rock.material.json"],
        )?;

        init_logs();
        let dir = tempfile::tempdir()?;
        write_file(dir.path(), "rock.kmsh", &mesh_bytes);
        write_file(dir.path(), "rock.material.json", material_json.as_bytes());
        write_file(dir.path(), "lit.wgsl", WGSL.as_bytes());
        write_file(dir.path(), "rock.png", &png_bytes(2, 2));

        let mut manager = AssetManager::new(FileSource::new(dir.path()));
        let mut device = HeadlessDevice::new();

        let mesh = manager.load_mesh(
            &mut device,
            "rock.kmsh",
            LoadOptions::default(),
            LoadMode::Background,
        )?;
        assert!(!mesh.lock().is_valid());

        drive(&mut manager, &mut device);

        assert!(mesh.lock().is_valid());
        assert_eq!(manager.stats().total(), 4);
        assert_eq!(device.alive_meshes(), 1);
        assert_eq!(device.alive_textures(), 1);
        assert_eq!(device.alive_shaders(), 1);
        Ok(())
    }

    #[test]
    fn test_hot_reload_shader_edit() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "basic.wgsl", WGSL.as_bytes());

        let mut manager = AssetManager::with_hot_reload(FileSource::new(dir.path()), true);
        let mut device = HeadlessDevice::new();

        let shader = manager
            .load_shader(
                &mut device,
                "basic.wgsl",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        // Nothing changed yet
        assert!(manager.poll_hot_reload(&mut device).is_empty());

        write_file(dir.path(), "basic.wgsl", b"@fragment fn fs_main() {}");
        bump_mtime(dir.path(), "basic.wgsl", Duration::from_secs(5));

        let reloaded = manager.poll_hot_reload(&mut device);
        assert_eq!(reloaded, vec!["basic.wgsl".to_string()]);
        assert!(shader.lock().is_valid());
        assert!(shader.lock().source().unwrap().contains("fs_main"));
        assert_eq!(device.alive_shaders(), 1);
    }

    #[test]
    fn test_hot_reload_recovers_after_broken_edit() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "basic.wgsl", WGSL.as_bytes());

        let mut manager = AssetManager::with_hot_reload(FileSource::new(dir.path()), true);
        let mut device = HeadlessDevice::new();

        let shader = manager
            .load_shader(
                &mut device,
                "basic.wgsl",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        // A bad edit leaves the entry in a failed state
        write_file(dir.path(), "basic.wgsl", b"   ");
        bump_mtime(dir.path(), "basic.wgsl", Duration::from_secs(5));
        assert!(manager.poll_hot_reload(&mut device).is_empty());
        assert_eq!(shader.lock().state(), LoadState::Failed);
        assert_eq!(device.alive_shaders(), 0);

        // Fixing the file brings it back
        write_file(dir.path(), "basic.wgsl", WGSL.as_bytes());
        bump_mtime(dir.path(), "basic.wgsl", Duration::from_secs(10));
        let reloaded = manager.poll_hot_reload(&mut device);
        assert_eq!(reloaded.len(), 1);
        assert!(shader.lock().is_valid());
        assert_eq!(device.alive_shaders(), 1);
    }

    #[test]
    fn test_hot_reload_covers_every_alias_of_a_file() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "shared.png", &png_bytes(2, 2));

        let mut manager = AssetManager::with_hot_reload(FileSource::new(dir.path()), true);
        let mut device = HeadlessDevice::new();

        let ui = manager
            .load_texture(
                &mut device,
                "shared.png",
                TextureOptions::aliased("ui"),
                LoadMode::Blocking,
            )
            .unwrap();
        let world = manager
            .load_texture(
                &mut device,
                "shared.png",
                TextureOptions::aliased("world"),
                LoadMode::Blocking,
            )
            .unwrap();
        assert_eq!(device.alive_textures(), 2);

        write_file(dir.path(), "shared.png", &png_bytes(4, 4));
        bump_mtime(dir.path(), "shared.png", Duration::from_secs(5));

        let mut reloaded = manager.poll_hot_reload(&mut device);
        reloaded.sort();
        assert_eq!(reloaded, vec!["ui".to_string(), "world".to_string()]);
        assert_eq!(ui.lock().dimensions(), (4, 4));
        assert_eq!(world.lock().dimensions(), (4, 4));
        assert_eq!(manager.ref_count(AssetKind::Texture, "ui"), Some(1));
        assert_eq!(device.alive_textures(), 2);
    }

    #[test]
    fn test_hot_reload_disabled_by_default() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "basic.wgsl", WGSL.as_bytes());

        let mut manager = AssetManager::new(FileSource::new(dir.path()));
        let mut device = HeadlessDevice::new();

        manager
            .load_shader(
                &mut device,
                "basic.wgsl",
                LoadOptions::default(),
                LoadMode::Blocking,
            )
            .unwrap();

        write_file(dir.path(), "basic.wgsl", b"@fragment fn fs_main() {}");
        bump_mtime(dir.path(), "basic.wgsl", Duration::from_secs(5));
        assert!(manager.poll_hot_reload(&mut device).is_empty());
    }
}
