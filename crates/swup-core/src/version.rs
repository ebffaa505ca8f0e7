//! Toolchain version resolution.
//!
//! Candidates are tried in priority order and the first present, non-empty
//! value wins. Each candidate is a closure so that lower-priority sources
//! (like the pin file) are never touched when a higher one answers.

use std::path::Path;

use swup_schema::ToolchainVersion;

use crate::error::{Error, Result};
use crate::host::Host;

/// Pin file read from the working directory.
pub const PIN_FILE: &str = ".swift-version";

/// Host input naming the requested version.
pub const VERSION_INPUT: &str = "swift-version";

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Command-line argument or nightly override.
    Argument,
    /// Host input (`swift-version`).
    Input,
    /// `.swift-version` in the working directory.
    PinFile,
    /// Built-in default.
    Default,
}

impl std::fmt::Display for VersionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Argument => "argument",
            Self::Input => "input",
            Self::PinFile => "pin file",
            Self::Default => "default",
        })
    }
}

/// A lazily evaluated version candidate.
pub type Candidate<'a> = (
    VersionSource,
    Box<dyn FnOnce() -> Result<Option<String>> + 'a>,
);

/// Return the first candidate yielding a non-empty value after trimming.
///
/// # Errors
///
/// The first error a lookup reports before any candidate answers.
pub fn first_present<'a>(
    candidates: impl IntoIterator<Item = Candidate<'a>>,
) -> Result<Option<(VersionSource, String)>> {
    for (source, lookup) in candidates {
        if let Some(value) = lookup()?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            return Ok(Some((source, value)));
        }
    }
    Ok(None)
}

/// Read and trim the pin file in `dir`.
///
/// A missing file and a blank one are both `Ok(None)`.
///
/// # Errors
///
/// Any read failure other than the file not existing, including content
/// that is not valid UTF-8.
pub fn read_pin_file(dir: &Path) -> Result<Option<String>> {
    let contents = match std::fs::read_to_string(dir.join(PIN_FILE)) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Inputs to [`resolve_version`].
#[derive(Debug, Clone, Default)]
pub struct VersionRequest<'a> {
    /// Explicit argument; beats everything else.
    pub argument: Option<&'a str>,
    /// Directory searched for the pin file.
    pub work_dir: Option<&'a Path>,
    /// Fallback when nothing else is configured.
    pub default: Option<&'a str>,
}

/// Resolve and validate the toolchain version.
///
/// Precedence: argument, host input, pin file, default.
///
/// # Errors
///
/// [`Error::MissingVersion`] when no source yields a value,
/// [`Error::Io`] when an existing pin file cannot be read, and
/// [`Error::Validation`] when the winning value is malformed.
pub fn resolve_version(host: &dyn Host, request: &VersionRequest<'_>) -> Result<ToolchainVersion> {
    let candidates: Vec<Candidate<'_>> = vec![
        (
            VersionSource::Argument,
            Box::new(|| Ok(request.argument.map(str::to_string))),
        ),
        (
            VersionSource::Input,
            Box::new(|| Ok(host.get_input(VERSION_INPUT))),
        ),
        (
            VersionSource::PinFile,
            Box::new(|| match request.work_dir {
                Some(dir) => read_pin_file(dir),
                None => Ok(None),
            }),
        ),
        (
            VersionSource::Default,
            Box::new(|| Ok(request.default.map(str::to_string))),
        ),
    ];

    let found = first_present(candidates).inspect_err(|e| host.error(&e.to_string()))?;
    let Some((source, raw)) = found else {
        let err = Error::MissingVersion;
        host.error(&err.to_string());
        return Err(err);
    };
    host.debug(&format!("Using version from {source}: {raw}"));

    Ok(ToolchainVersion::parse(&raw)?)
}
