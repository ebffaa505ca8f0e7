//! Subcommand implementations.

pub mod nightly;
pub mod sdk;
pub mod toolchain;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use swup_core::{Host, ProcessRunner, TokioProcessRunner, paths};

use crate::Cli;
use crate::host::ActionsHost;

/// State shared by every subcommand.
#[derive(Clone)]
pub struct Context {
    pub host: Arc<dyn Host>,
    pub runner: Arc<dyn ProcessRunner>,
    pub client: reqwest::Client,
    pub cache_root: PathBuf,
    pub work_dir: PathBuf,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cache_root", &self.cache_root)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        host: Arc<dyn Host>,
        runner: Arc<dyn ProcessRunner>,
        client: reqwest::Client,
        cache_root: PathBuf,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            host,
            runner,
            client,
            cache_root,
            work_dir,
        }
    }

    /// Build the runtime context from parsed flags and the environment.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cache_root = cli
            .cache_dir
            .clone()
            .or_else(paths::try_cache_root)
            .context("Could not determine a tool cache directory; pass --cache-dir")?;
        let work_dir = match &cli.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read the working directory")?,
        };
        Ok(Self::new(
            Arc::new(ActionsHost::from_env()),
            Arc::new(TokioProcessRunner),
            reqwest::Client::new(),
            cache_root,
            work_dir,
        ))
    }

    /// A flag value, else the host input `name`.
    pub fn flag_or_input(&self, flag: Option<&str>, name: &str) -> Option<String> {
        flag.map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.host.get_input(name))
    }
}
