// Platform file access with a replaceable read path

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Signature for a custom file reader.
///
/// Receives the fully resolved path (base directory already joined) and
/// returns the file contents. Used to serve assets from pack files, platform
/// bundles, or in-memory fixtures instead of the raw filesystem.
pub type ReadFn = dyn Fn(&Path) -> std::io::Result<Vec<u8>> + Send + Sync;

/// File access errors
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },

    #[error("Failed to write {name}: {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },
}

/// File source for asset loading
///
/// Resolves asset names against a base directory and reads them either
/// through the raw filesystem (default) or through a custom reader installed
/// with [`FileSource::with_reader`]. Swapping the reader does not change any
/// caller-visible behavior beyond where the bytes come from.
pub struct FileSource {
    /// Directory all asset names are resolved against
    base_path: PathBuf,

    /// Custom read function; `None` means raw filesystem reads
    reader: Option<Arc<ReadFn>>,
}

impl FileSource {
    /// Create a file source rooted at the given directory
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            reader: None,
        }
    }

    /// Install a custom read function
    pub fn with_reader(mut self, reader: Arc<ReadFn>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Get the full path for an asset name
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read the entire contents of an asset file
    pub fn load_file(&self, name: &str) -> Result<Vec<u8>, FileError> {
        let path = self.resolve(name);

        if let Some(reader) = &self.reader {
            return reader(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileError::NotFound(name.to_string()),
                _ => FileError::Read {
                    name: name.to_string(),
                    source: e,
                },
            });
        }

        if !path.exists() {
            return Err(FileError::NotFound(path.to_string_lossy().to_string()));
        }

        std::fs::read(&path).map_err(|e| FileError::Read {
            name: name.to_string(),
            source: e,
        })
    }

    /// Write a file under the base directory
    pub fn save_file(&self, name: &str, data: &[u8]) -> Result<(), FileError> {
        let path = self.resolve(name);
        std::fs::write(&path, data).map_err(|e| FileError::Write {
            name: name.to_string(),
            source: e,
        })
    }

    /// Check if an asset file exists
    pub fn file_exists(&self, name: &str) -> bool {
        if self.reader.is_some() {
            // A custom reader may serve names that are not on-disk paths,
            // so existence can only be checked through it.
            return self.load_file(name).is_ok();
        }
        self.resolve(name).exists()
    }
}
