// Development-time file watching for automatic asset reloads

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::AssetKind;

/// A watched registry entry whose source file changed on disk
#[derive(Debug, Clone)]
pub(crate) struct ChangedAsset {
    pub kind: AssetKind,
    pub key: String,
}

struct WatchEntry {
    mtime: u64,
    kind: AssetKind,
    key: String,
}

/// Polls modification times of loaded asset files
///
/// Cheap enough to poll every frame; granularity is whole seconds, which is
/// plenty for a human editing files. Paths without a filesystem mtime (e.g.
/// served by a custom reader) are simply not tracked.
pub(crate) struct HotReloadWatcher {
    watched: HashMap<PathBuf, Vec<WatchEntry>>,
}

impl HotReloadWatcher {
    pub fn new() -> Self {
        Self {
            watched: HashMap::new(),
        }
    }

    /// Start watching a file for the given registry entry
    ///
    /// One file can back several registry entries (aliases), so each entry
    /// keeps its own change baseline under the shared path.
    pub fn track(&mut self, path: PathBuf, kind: AssetKind, key: &str) {
        let mtime = match modification_time(&path) {
            Ok(mtime) => mtime,
            Err(_) => {
                log::debug!("Not watching '{}' (no filesystem mtime)", path.display());
                return;
            }
        };

        let entries = self.watched.entry(path).or_default();
        match entries.iter_mut().find(|e| e.kind == kind && e.key == key) {
            Some(entry) => entry.mtime = mtime,
            None => entries.push(WatchEntry {
                mtime,
                kind,
                key: key.to_string(),
            }),
        }
    }

    /// Entries whose files changed since the last poll
    pub fn poll_changed(&mut self) -> Vec<ChangedAsset> {
        let mut changed = Vec::new();
        for (path, entries) in self.watched.iter_mut() {
            let Ok(mtime) = modification_time(path) else {
                continue;
            };
            for entry in entries.iter_mut() {
                if mtime > entry.mtime {
                    entry.mtime = mtime;
                    changed.push(ChangedAsset {
                        kind: entry.kind,
                        key: entry.key.clone(),
                    });
                }
            }
        }
        changed
    }

    pub fn clear(&mut self) {
        self.watched.clear();
    }

    #[cfg(test)]
    pub fn watched_count(&self) -> usize {
        self.watched.values().map(|entries| entries.len()).sum()
    }
}

fn modification_time(path: &Path) -> std::io::Result<u64> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?;
    Ok(modified
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}
