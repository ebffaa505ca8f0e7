//! Host capability for dependency injection
//!
//! Every pipeline component receives a [`Host`] instead of reaching for
//! process-global state. The CI adapter in `swup-cli` forwards to the
//! runner's file commands; [`MemoryHost`] keeps everything in memory for
//! embedding and tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

/// A bundle of files handed to the host's artifact upload capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Artifact name shown by the host.
    pub name: String,
    /// Directory all `files` live under.
    pub root: PathBuf,
    /// Files to upload.
    pub files: Vec<PathBuf>,
    /// How long the host should keep the artifact.
    pub retention_days: u32,
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Verbose diagnostic message.
    fn debug(&self, msg: &str);

    /// Informational message.
    fn info(&self, msg: &str);

    /// Something went wrong but the run continues.
    fn warning(&self, msg: &str);

    /// Something went wrong and the run is about to fail.
    fn error(&self, msg: &str);

    /// Read a configured input. Unset and empty inputs are both `None`.
    fn get_input(&self, name: &str) -> Option<String>;

    /// Prepend `dir` to the execution path of subsequent steps.
    fn add_path(&self, dir: &Path) -> io::Result<()>;

    /// Publish a named result value.
    fn set_output(&self, name: &str, value: &str) -> io::Result<()>;

    /// Upload a bundle of files. Returns a human-readable location.
    async fn upload_artifact(&self, request: &UploadRequest) -> io::Result<String>;
}

/// A no-op host for silent operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

#[async_trait]
impl Host for NullHost {
    fn debug(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn get_input(&self, _: &str) -> Option<String> {
        None
    }
    fn add_path(&self, _: &Path) -> io::Result<()> {
        Ok(())
    }
    fn set_output(&self, _: &str, _: &str) -> io::Result<()> {
        Ok(())
    }
    async fn upload_artifact(&self, _: &UploadRequest) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "artifact upload is not available",
        ))
    }
}

/// Severity of a message captured by [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Default)]
struct MemoryState {
    messages: Vec<(Level, String)>,
    paths: Vec<PathBuf>,
    outputs: Vec<(String, String)>,
    uploads: Vec<UploadRequest>,
}

/// In-memory host: inputs come from a map, everything emitted is recorded.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inputs: HashMap<String, String>,
    accept_uploads: bool,
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure an input value.
    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    /// Make [`Host::upload_artifact`] succeed instead of failing.
    pub fn accepting_uploads(mut self) -> Self {
        self.accept_uploads = true;
        self
    }

    fn record(&self, level: Level, msg: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.messages.push((level, msg.to_string()));
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> T {
        match self.state.lock() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// All messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.with_state(|s| {
            s.messages
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        })
    }

    /// Directories added to the execution path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.with_state(|s| s.paths.clone())
    }

    /// Value of the last output named `name`.
    pub fn output(&self, name: &str) -> Option<String> {
        self.with_state(|s| {
            s.outputs
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        })
    }

    /// Upload requests received so far.
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.with_state(|s| s.uploads.clone())
    }
}

#[async_trait]
impl Host for MemoryHost {
    fn debug(&self, msg: &str) {
        self.record(Level::Debug, msg);
    }
    fn info(&self, msg: &str) {
        self.record(Level::Info, msg);
    }
    fn warning(&self, msg: &str) {
        self.record(Level::Warning, msg);
    }
    fn error(&self, msg: &str) {
        self.record(Level::Error, msg);
    }

    fn get_input(&self, name: &str) -> Option<String> {
        self.inputs
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn add_path(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.state.lock().map_err(|_| io::Error::other("host state poisoned"))?;
        state.paths.push(dir.to_path_buf());
        Ok(())
    }

    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        let mut state = self.state.lock().map_err(|_| io::Error::other("host state poisoned"))?;
        state.outputs.push((name.to_string(), value.to_string()));
        Ok(())
    }

    async fn upload_artifact(&self, request: &UploadRequest) -> io::Result<String> {
        if !self.accept_uploads {
            return Err(io::Error::other("upload rejected"));
        }
        let mut state = self.state.lock().map_err(|_| io::Error::other("host state poisoned"))?;
        state.uploads.push(request.clone());
        Ok(format!("memory://{}", request.name))
    }
}
