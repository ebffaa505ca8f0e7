//! Download URL construction for toolchain release artifacts.

use swup_schema::{PlatformDescriptor, ToolchainVersion};

/// Where toolchain releases are published.
///
/// URLs follow
/// `<host>/<owner>/<repo>/releases/download/<prefix>-<version>/<prefix>-<version>-<suffix>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLocation {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub tag_prefix: String,
}

impl Default for ReleaseLocation {
    fn default() -> Self {
        Self {
            host: "https://github.com".to_string(),
            owner: "swiftwasm".to_string(),
            repo: "swift".to_string(),
            tag_prefix: "swift".to_string(),
        }
    }
}

impl ReleaseLocation {
    /// Download URL for `version` on `platform`.
    pub fn artifact_url(&self, version: &ToolchainVersion, platform: &PlatformDescriptor) -> String {
        self.url_for(
            version.as_str(),
            &platform.artifact_suffix,
            platform.package_format.extension(),
        )
    }

    /// Same as [`artifact_url`](Self::artifact_url) over raw strings.
    pub fn url_for(&self, version: &str, suffix: &str, extension: &str) -> String {
        let host = self.host.trim_end_matches('/');
        let tag = format!("{}-{version}", self.tag_prefix);
        format!(
            "{host}/{}/{}/releases/download/{tag}/{tag}-{suffix}.{extension}",
            self.owner, self.repo
        )
    }

    /// Release tag for a version, e.g. `swift-wasm-5.8.0-RELEASE`.
    pub fn tag_for(&self, version: &str) -> String {
        format!("{}-{version}", self.tag_prefix)
    }

    /// Inverse of [`tag_for`](Self::tag_for). `None` if `tag` is not ours.
    pub fn version_from_tag<'t>(&self, tag: &'t str) -> Option<&'t str> {
        tag.strip_prefix(self.tag_prefix.as_str())?
            .strip_prefix('-')
            .filter(|v| !v.is_empty())
    }
}
