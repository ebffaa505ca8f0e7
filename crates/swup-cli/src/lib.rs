//! swup - SwiftWasm toolchain and SDK provisioning
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs a SwiftWasm toolchain into the runner's tool cache, installs a
//! matching target SDK from the SDK index, and finds the newest nightly
//! snapshot. Built to run as a CI step: inputs are read from `INPUT_*`
//! variables and results are written to `GITHUB_PATH` / `GITHUB_OUTPUT`.
//!
//! # Outputs
//!
//! ```text
//! toolchain-path    root of the installed toolchain (bin dir is <root>/usr/bin)
//! sdk-id            id of the installed Swift SDK
//! nightly-tag       newest nightly release tag
//! diagnostics-path  staged crash diagnostics, only after an SDK install crash
//! ```

pub mod cmd;
pub mod host;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use swup_core::nightly::{NIGHTLY_PREFIX, RELEASES_API};
use swup_core::sdk::DEFAULT_SDK_INDEX_URL;

pub use host::ActionsHost;

#[derive(Debug, Parser)]
#[command(name = "swup")]
#[command(author, version = env!("SWUP_VERSION"), about = "Provision SwiftWasm toolchains and SDKs")]
pub struct Cli {
    /// Tool cache root [default: $RUNNER_TOOL_CACHE, else the user cache dir]
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding .swift-version; crash diagnostics are staged here too
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a toolchain and put it on the PATH
    Toolchain {
        /// Toolchain version, e.g. wasm-5.8.0-RELEASE [overrides the swift-version input]
        #[arg(long = "swift-version")]
        version: Option<String>,
        /// Version used when neither input nor .swift-version provide one
        #[arg(long)]
        default_version: Option<String>,
    },
    /// Install the Swift SDK matching the active toolchain
    Sdk {
        /// SDK build tag [overrides the tag input; default: looked up from `swift --version`]
        #[arg(long)]
        tag: Option<String>,
        /// SDK target [overrides the target input]
        #[arg(long)]
        target: Option<String>,
        /// swift executable to query and install with
        #[arg(long, default_value = "swift")]
        swift: String,
        /// Base URL of the SDK index
        #[arg(long, env = "SWUP_SDK_INDEX_URL", default_value = DEFAULT_SDK_INDEX_URL)]
        index_url: String,
    },
    /// Find the newest nightly snapshot tag
    Nightly {
        /// API token [overrides the github-token input]; enables authenticated paging
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Release listing endpoint
        #[arg(long, default_value = RELEASES_API)]
        releases_url: String,
        /// Tag prefix identifying nightly releases
        #[arg(long, default_value = NIGHTLY_PREFIX)]
        prefix: String,
        /// Also install the toolchain for the tag that was found
        #[arg(long)]
        install: bool,
    },
}
