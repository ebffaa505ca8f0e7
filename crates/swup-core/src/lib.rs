pub mod cache;
pub mod diagnostics;
pub mod download;
pub mod error;
pub mod extract;
pub mod host;
pub mod install;
pub mod locator;
pub mod nightly;
pub mod paths;
pub mod platform;
pub mod process;
pub mod sdk;
pub mod sdk_install;
pub mod version;

pub use error::{Error, Result};
pub use host::{Host, NullHost};
pub use process::{ProcessRunner, TokioProcessRunner};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("swup-core/", env!("CARGO_PKG_VERSION"));
