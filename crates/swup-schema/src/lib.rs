//! Shared domain types for swup.
//!
//! Everything in this crate is plain data: no network, no filesystem. The
//! pipeline in `swup-core` produces and consumes these types, and the CLI
//! prints them.

pub mod arch;
pub mod platform;
pub mod sdk;
pub mod version;

// Re-exports
pub use arch::Arch;
pub use platform::{OsFamily, PackageFormat, PlatformDescriptor};
pub use sdk::{BuildManifest, SdkDescriptor};
pub use version::ToolchainVersion;

/// Errors raised while validating schema values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The version string was empty.
    #[error("Empty version specified.")]
    EmptyVersion,

    /// The version string does not carry the required target prefix.
    #[error(
        "Invalid version specified: {0}. Version must start with '{prefix}'. For example: '{example}'",
        prefix = version::VERSION_PREFIX,
        example = version::EXAMPLE_VERSION
    )]
    MissingPrefix(String),

    /// The architecture string is not one we ship toolchains for.
    #[error("Unsupported architecture: {0}")]
    UnknownArch(String),

    /// The packaging kind is not one we know how to unpack.
    #[error("Unsupported package type: {0}")]
    UnknownPackageFormat(String),
}
