//! Domain-specific errors for provisioning operations

use std::path::PathBuf;

use swup_schema::SchemaError;
use thiserror::Error;

use crate::diagnostics::DiagnosticsBundle;
use crate::extract::ExtractError;

/// Every failure that terminates a provisioning run.
///
/// Diagnostics problems are deliberately absent: they are reported through
/// [`crate::diagnostics::DiagnosticsError`] and only ever logged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error(
        "No Swift version specified. Please specify a version using the 'swift-version' input or a .swift-version file."
    )]
    MissingVersion,

    #[error("Unsupported {kind}: {value}")]
    UnsupportedPlatform { kind: &'static str, value: String },

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("Unsupported package type: {0}")]
    UnsupportedPackageFormat(String),

    #[error("No tag found in the SDK index for toolchain version '{0}'")]
    IndexLookup(String),

    #[error(
        "Swift SDK target '{target}' is not available in this build (available: {})",
        .available.join(", ")
    )]
    Configuration {
        target: String,
        available: Vec<String>,
    },

    #[error("`{command}` failed: {reason}")]
    Subprocess {
        command: String,
        reason: String,
        diagnostics: Option<Box<DiagnosticsBundle>>,
    },

    #[error("No release tag starting with '{0}' found")]
    NotFound(String),

    #[error("Extraction of {path} failed: {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Wrap a transport or status error for `url`.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Wrap a decoding failure for the payload described by `what`.
    pub fn parse(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::EmptyVersion | SchemaError::MissingPrefix(_) => {
                Self::Validation(err.to_string())
            }
            SchemaError::UnknownArch(value) => Self::UnsupportedPlatform {
                kind: "architecture",
                value,
            },
            SchemaError::UnknownPackageFormat(value) => Self::UnsupportedPackageFormat(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_map_to_taxonomy() {
        assert!(matches!(
            Error::from(SchemaError::EmptyVersion),
            Error::Validation(_)
        ));
        assert!(matches!(
            Error::from(SchemaError::UnknownArch("ppc".into())),
            Error::UnsupportedPlatform { kind: "architecture", .. }
        ));
        assert!(matches!(
            Error::from(SchemaError::UnknownPackageFormat("zip".into())),
            Error::UnsupportedPackageFormat(ref v) if v == "zip"
        ));
    }

    #[test]
    fn test_configuration_message_lists_targets() {
        let err = Error::Configuration {
            target: "wasm32-unknown-emscripten".into(),
            available: vec!["wasm32-unknown-wasi".into(), "wasm32-unknown-wasip1-threads".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("wasm32-unknown-emscripten"));
        assert!(msg.contains("wasm32-unknown-wasi, wasm32-unknown-wasip1-threads"));
    }
}
