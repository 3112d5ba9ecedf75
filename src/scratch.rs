use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Preview files (captured audio for playback, fetched Grad-CAM images) are
/// materialized under the cache directory and must be released when replaced
/// or on session reset; `sweep` clears anything a previous run left behind.
pub struct ScratchRegistry {
    dir: PathBuf,
}

impl ScratchRegistry {
    /// Directory: ~/.cache/pneumoscan/previews/
    pub fn new() -> Self {
        let mut dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push("pneumoscan");
        dir.push("previews");
        Self { dir }
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Remove leftover preview files from earlier runs.
    pub fn sweep(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            if let Err(e) = fs::remove_file(entry.path()) {
                log::warn!("Could not remove stale preview {:?}: {e}", entry.path());
            }
        }
    }

    /// Write `bytes` to a fresh preview file and return its path. Each call
    /// produces a distinct name so a replaced preview is never read through
    /// a cached handle to the old one.
    pub fn materialize(
        &self,
        stem: &str,
        ext: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.dir)?;
        let n = SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("{stem}-{n}.{ext}"));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Release a preview file. Failures are logged, not fatal: the sweep on
    /// next startup catches stragglers.
    pub fn release(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Could not remove preview {}: {e}", path.display());
        }
    }
}

impl Default for ScratchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialize_writes_and_release_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ScratchRegistry::with_dir(tmp.path().to_path_buf());

        let path = registry.materialize("capture", "wav", b"RIFF").unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"RIFF");

        registry.release(&path);
        assert!(!path.exists());
    }

    #[test]
    fn materialize_yields_distinct_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ScratchRegistry::with_dir(tmp.path().to_path_buf());

        let a = registry.materialize("cam", "png", b"a").unwrap();
        let b = registry.materialize("cam", "png", b"b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_clears_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ScratchRegistry::with_dir(tmp.path().to_path_buf());
        registry.materialize("capture", "wav", b"x").unwrap();
        registry.materialize("cam", "png", b"y").unwrap();

        registry.sweep();
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
