//! Host platform description and packaging kinds.

use serde::{Deserialize, Serialize};

use crate::{Arch, SchemaError};

/// Operating system family a toolchain is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Linux distributions (further qualified by distro and version).
    Linux,
    /// macOS.
    Macos,
}

impl OsFamily {
    /// Lowercase name of the OS family.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a toolchain artifact is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageFormat {
    /// Gzip-compressed tar archive (`.tar.gz`).
    #[serde(rename = "tar.gz")]
    Archive,
    /// macOS installer package (`.pkg`): a xar container holding a `Payload`.
    #[serde(rename = "pkg")]
    InstallerPackage,
}

impl PackageFormat {
    /// File extension used in the download URL.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Archive => "tar.gz",
            Self::InstallerPackage => "pkg",
        }
    }
}

impl std::fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for PackageFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar.gz" | "tgz" => Ok(Self::Archive),
            "pkg" => Ok(Self::InstallerPackage),
            _ => Err(SchemaError::UnknownPackageFormat(s.to_string())),
        }
    }
}

/// Everything the pipeline needs to know about the host to pick an artifact.
///
/// Computed once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    /// OS family.
    pub os: OsFamily,
    /// Distribution id from `/etc/os-release` (Linux only).
    pub distro: Option<String>,
    /// Distribution version id (Linux only).
    pub distro_version: Option<String>,
    /// Normalized CPU architecture.
    pub arch: Arch,
    /// Packaging of the artifact for this platform.
    pub package_format: PackageFormat,
    /// Platform part of the artifact file name, e.g. `ubuntu22.04_x86_64`.
    pub artifact_suffix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_format_serde_names() {
        let json = serde_json::to_string(&PackageFormat::Archive).unwrap();
        assert_eq!(json, "\"tar.gz\"");
        let back: PackageFormat = serde_json::from_str("\"pkg\"").unwrap();
        assert_eq!(back, PackageFormat::InstallerPackage);
    }

    #[test]
    fn test_package_format_unknown() {
        let err = "zip".parse::<PackageFormat>().unwrap_err();
        assert_eq!(err, SchemaError::UnknownPackageFormat("zip".to_string()));
    }
}
