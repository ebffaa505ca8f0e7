//! CPU architecture of the host that receives the toolchain.
//!
//! `SwiftWasm` publishes toolchains for ARM64 and `x86_64` hosts. The value is
//! used both in the artifact suffix and as part of the cache key.
//!
//! # Example
//!
//! ```
//! use swup_schema::Arch;
//!
//! let arch: Arch = "x64".parse().unwrap();
//! assert_eq!(arch.as_str(), "x86_64");
//! ```

use crate::SchemaError;

/// Normalized host architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// ARM64 (Apple Silicon, Graviton, ...)
    Arm64,
    /// `x86_64`
    X86_64,
}

impl Arch {
    /// Convert to the spelling used in artifact names and cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = SchemaError;

    /// Accepts the spellings reported by CI runners (`x64`), by Rust
    /// (`aarch64`, `x86_64`) and by package managers (`amd64`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "x64" | "amd64" => Ok(Self::X86_64),
            _ => Err(SchemaError::UnknownArch(s.to_string())),
        }
    }
}
