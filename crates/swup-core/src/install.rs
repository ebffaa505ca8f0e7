//! Cache-aware toolchain installation.
//!
//! Flow: cache lookup → download → extract → store → return the cached
//! path. A cache hit returns before any network or extraction work.

use std::path::PathBuf;
use std::sync::Arc;

use swup_schema::{PackageFormat, PlatformDescriptor, ToolchainVersion};

use crate::cache::{CacheKey, ToolCache};
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::paths;

/// Tool name used in cache keys.
pub const TOOL_NAME: &str = "swiftwasm";

pub struct ToolchainInstaller {
    cache: ToolCache,
    downloader: Arc<dyn Downloader>,
    host: Arc<dyn Host>,
}

impl std::fmt::Debug for ToolchainInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainInstaller")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ToolchainInstaller {
    pub fn new(cache: ToolCache, downloader: Arc<dyn Downloader>, host: Arc<dyn Host>) -> Self {
        Self {
            cache,
            downloader,
            host,
        }
    }

    /// Install the toolchain at `url`, or reuse the cached copy.
    ///
    /// Returns the toolchain root inside the cache.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the download fails, [`Error::Extract`] if the
    /// artifact cannot be unpacked, [`Error::Io`] for local filesystem
    /// failures.
    pub async fn install(
        &self,
        url: &str,
        version: &ToolchainVersion,
        platform: &PlatformDescriptor,
    ) -> Result<PathBuf> {
        let key = CacheKey::new(TOOL_NAME, version.as_str(), platform.arch);
        if let Some(cached) = self.cache.find(&key) {
            self.host.info("Toolchain already installed.");
            return Ok(cached);
        }

        let tmp_root = paths::tmp_path(self.cache.root());
        tokio::fs::create_dir_all(&tmp_root).await?;
        let scratch = tempfile::Builder::new()
            .prefix("swup-")
            .tempdir_in(&tmp_root)?;

        let file_name = match paths::filename_from_url(url) {
            "" => format!("toolchain.{}", platform.package_format.extension()),
            name => name.to_string(),
        };
        let download_path = scratch.path().join(file_name);

        self.host.debug(&format!("Downloading tool from {url}"));
        let bytes = self.downloader.download(url, &download_path).await?;
        self.host
            .debug(&format!("Downloaded {bytes} bytes to {}", download_path.display()));

        self.host.debug(&format!(
            "Installing toolchain from {}",
            download_path.display()
        ));
        let extract_dir = scratch.path().join("extract");
        let root = extract_artifact(platform.package_format, download_path, extract_dir).await?;
        self.host
            .debug(&format!("Installed toolchain to {}", root.display()));

        let cached = self.cache.store_dir(&root, &key).await?;
        self.host
            .debug(&format!("Cached {key} at {}", cached.display()));
        Ok(cached)
    }
}

async fn extract_artifact(
    format: PackageFormat,
    archive: PathBuf,
    dest: PathBuf,
) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        crate::extract::extract(format, &archive, &dest).map_err(|source| Error::Extract {
            path: archive.clone(),
            source,
        })
    })
    .await
    .map_err(std::io::Error::other)?
}
