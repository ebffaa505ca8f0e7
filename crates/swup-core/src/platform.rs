//! Host platform detection.
//!
//! Maps the reported OS name, CPU architecture and (on Linux) the contents
//! of `/etc/os-release` onto a [`PlatformDescriptor`]. Only explicitly
//! enumerated combinations are accepted; everything else fails closed.

use std::collections::HashMap;
use std::path::Path;

use swup_schema::{Arch, OsFamily, PackageFormat, PlatformDescriptor};

use crate::error::{Error, Result};

/// System identification file consulted on Linux.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Raw facts about the host, gathered once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
    pub os_release: Option<String>,
}

impl HostInfo {
    /// Inspect the running host.
    ///
    /// # Errors
    ///
    /// Returns an IO error if `/etc/os-release` exists but cannot be read.
    pub async fn detect() -> Result<Self> {
        Self::detect_with(Path::new(OS_RELEASE_PATH)).await
    }

    async fn detect_with(os_release_path: &Path) -> Result<Self> {
        let os = std::env::consts::OS.to_string();
        let os_release = if os == "linux" {
            match tokio::fs::read_to_string(os_release_path).await {
                Ok(contents) => Some(contents),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };
        Ok(Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            os_release,
        })
    }

    /// Resolve these facts into a descriptor.
    ///
    /// # Errors
    ///
    /// See [`resolve_platform`].
    pub fn resolve(&self) -> Result<PlatformDescriptor> {
        resolve_platform(&self.os, &self.arch, self.os_release.as_deref())
    }
}

/// Parse `key=value` lines, stripping quotes around values.
///
/// Lines without `=`, with an empty key or with an empty value are skipped,
/// as are comments.
pub fn parse_os_release(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = key.trim();
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn normalize_os(os: &str) -> Result<OsFamily> {
    match os {
        "linux" => Ok(OsFamily::Linux),
        "darwin" | "macos" => Ok(OsFamily::Macos),
        other => Err(Error::UnsupportedPlatform {
            kind: "platform",
            value: other.to_string(),
        }),
    }
}

/// Map host facts to a platform descriptor.
///
/// Supported today:
/// - Ubuntu, any `VERSION_ID` (`tar.gz`)
/// - Amazon Linux 2 (`tar.gz`)
/// - macOS (`pkg`)
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] carrying the offending OS name,
/// architecture, distribution id or distribution version.
pub fn resolve_platform(
    os: &str,
    arch: &str,
    os_release: Option<&str>,
) -> Result<PlatformDescriptor> {
    match normalize_os(os)? {
        OsFamily::Macos => {
            let arch: Arch = arch.parse()?;
            Ok(PlatformDescriptor {
                os: OsFamily::Macos,
                distro: None,
                distro_version: None,
                arch,
                package_format: PackageFormat::InstallerPackage,
                artifact_suffix: format!("macos_{arch}"),
            })
        }
        OsFamily::Linux => {
            let release = parse_os_release(os_release.unwrap_or_default());
            let id = release.get("ID").ok_or_else(|| Error::UnsupportedPlatform {
                kind: "distribution",
                value: format!("unknown (no ID in {OS_RELEASE_PATH})"),
            })?;
            let version_id = release.get("VERSION_ID").cloned().unwrap_or_default();

            let suffix_prefix = match id.as_str() {
                "ubuntu" => format!("ubuntu{version_id}"),
                "amzn" if version_id == "2" => "amazonlinux2".to_string(),
                "amzn" => {
                    return Err(Error::UnsupportedPlatform {
                        kind: "distribution version",
                        value: format!("{id} {version_id}"),
                    });
                }
                other => {
                    return Err(Error::UnsupportedPlatform {
                        kind: "distribution",
                        value: other.to_string(),
                    });
                }
            };

            let arch: Arch = arch.parse()?;
            Ok(PlatformDescriptor {
                os: OsFamily::Linux,
                distro: Some(id.clone()),
                distro_version: Some(version_id),
                arch,
                package_format: PackageFormat::Archive,
                artifact_suffix: format!("{suffix_prefix}_{arch}"),
            })
        }
    }
}
