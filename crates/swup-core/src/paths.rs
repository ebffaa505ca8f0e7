use std::path::{Path, PathBuf};

/// Returns the tool cache root, or None if no cache directory can be resolved.
///
/// CI runners export `RUNNER_TOOL_CACHE`; elsewhere we fall back to the
/// user's cache directory.
pub fn try_cache_root() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("RUNNER_TOOL_CACHE") {
        if !val.is_empty() {
            return Some(PathBuf::from(val));
        }
    }
    dirs::cache_dir().map(|d| d.join("swup"))
}

/// Scratch space for downloads: `<cache>/.tmp` (same volume as the cache).
pub fn tmp_path(cache_root: &Path) -> PathBuf {
    cache_root.join(".tmp")
}

/// Directory whose `bin/` holds the toolchain executables.
pub fn toolchain_bin_dir(root: &Path) -> PathBuf {
    root.join("usr").join("bin")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
