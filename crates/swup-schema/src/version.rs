//! Validated toolchain version strings.

use crate::SchemaError;

/// Prefix every `SwiftWasm` toolchain version carries.
pub const VERSION_PREFIX: &str = "wasm-";

/// Example shown to users who pass a malformed version.
pub const EXAMPLE_VERSION: &str = "wasm-5.7.1-RELEASE";

/// A toolchain version such as `wasm-5.8.0-RELEASE`.
///
/// Can only be constructed through [`ToolchainVersion::parse`], so holding one
/// means the value is non-empty and target-prefixed.
///
/// # Example
///
/// ```
/// use swup_schema::ToolchainVersion;
///
/// let v = ToolchainVersion::parse("wasm-5.8.0-RELEASE").unwrap();
/// assert_eq!(v.as_str(), "wasm-5.8.0-RELEASE");
/// assert!(ToolchainVersion::parse("5.8.0-RELEASE").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ToolchainVersion(String);

impl ToolchainVersion {
    /// Validate a raw version string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyVersion`] for an empty string and
    /// [`SchemaError::MissingPrefix`] when the `wasm-` prefix is absent.
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        if raw.is_empty() {
            return Err(SchemaError::EmptyVersion);
        }
        if !raw.starts_with(VERSION_PREFIX) {
            return Err(SchemaError::MissingPrefix(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrow the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ToolchainVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
