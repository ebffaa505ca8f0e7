//! Cross-run tool cache.
//!
//! Layout: `<root>/<tool>/<version>/<arch>/` holds the toolchain root and
//! `<root>/<tool>/<version>/<arch>.complete` marks the entry as usable. An
//! entry without its marker (an interrupted store) is a miss and gets
//! overwritten by the next store for the same key.
//!
//! There is no locking: two runs storing the same key concurrently both do
//! the work and the last writer wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use swup_schema::Arch;
use walkdir::WalkDir;

/// Identity of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tool: String,
    pub version: String,
    pub arch: Arch,
}

impl CacheKey {
    pub fn new(tool: impl Into<String>, version: impl Into<String>, arch: Arch) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            arch,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} ({})", self.tool, self.version, self.arch)
    }
}

/// Directory-backed tool cache.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(&key.tool).join(&key.version)
    }

    fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.version_dir(key).join(key.arch.as_str())
    }

    fn marker(&self, key: &CacheKey) -> PathBuf {
        self.version_dir(key)
            .join(format!("{}.complete", key.arch.as_str()))
    }

    /// Path of a completed entry, if present.
    pub fn find(&self, key: &CacheKey) -> Option<PathBuf> {
        let dir = self.entry_dir(key);
        (dir.is_dir() && self.marker(key).is_file()).then_some(dir)
    }

    /// Move (or copy, across filesystems) `source` into the cache under `key`.
    ///
    /// Returns the cached directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the entry cannot be written.
    pub async fn store_dir(&self, source: &Path, key: &CacheKey) -> io::Result<PathBuf> {
        let dest = self.entry_dir(key);
        let marker = self.marker(key);
        let source = source.to_path_buf();

        tokio::task::spawn_blocking(move || {
            // Stale or half-written entries are replaced wholesale.
            let _ = fs::remove_file(&marker);
            if dest.exists() {
                fs::remove_dir_all(&dest)?;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            if fs::rename(&source, &dest).is_err() {
                copy_tree(&source, &dest)?;
            }

            fs::write(&marker, b"")?;
            Ok(dest)
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Recursively copy `src` into `dest`, preserving symlinks.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            fs::copy(entry.path(), &target).map(|_| ())?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
