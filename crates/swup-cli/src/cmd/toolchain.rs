//! `swup toolchain`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use swup_core::cache::ToolCache;
use swup_core::download::HttpDownloader;
use swup_core::install::ToolchainInstaller;
use swup_core::locator::ReleaseLocation;
use swup_core::paths;
use swup_core::platform::HostInfo;
use swup_core::version::{VersionRequest, resolve_version};

use super::Context;

/// Output naming the installed toolchain root.
pub const TOOLCHAIN_OUTPUT: &str = "toolchain-path";

/// Resolve, install and expose a toolchain. Returns its root.
pub async fn toolchain(
    ctx: &Context,
    version: Option<&str>,
    default_version: Option<&str>,
) -> Result<PathBuf> {
    let request = VersionRequest {
        argument: version,
        work_dir: Some(ctx.work_dir.as_path()),
        default: default_version,
    };
    let version = resolve_version(ctx.host.as_ref(), &request)?;

    let platform = HostInfo::detect().await?.resolve()?;
    let url = ReleaseLocation::default().artifact_url(&version, &platform);
    ctx.host
        .debug(&format!("Resolved toolchain download URL: {url}"));

    let installer = ToolchainInstaller::new(
        ToolCache::new(&ctx.cache_root),
        Arc::new(HttpDownloader::new(ctx.client.clone())),
        ctx.host.clone(),
    );
    let root = installer.install(&url, &version, &platform).await?;

    ctx.host
        .info(&format!("Toolchain installed at {}", root.display()));
    ctx.host.add_path(&paths::toolchain_bin_dir(&root))?;
    ctx.host
        .set_output(TOOLCHAIN_OUTPUT, &root.display().to_string())?;
    Ok(root)
}
