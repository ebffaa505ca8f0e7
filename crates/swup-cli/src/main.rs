//! swup command-line entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use swup_cli::cmd::{self, Context};
use swup_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries outputs when no GITHUB_OUTPUT is set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Toolchain {
            version,
            default_version,
        } => cmd::toolchain::toolchain(&ctx, version.as_deref(), default_version.as_deref())
            .await
            .map(|_| ()),
        Commands::Sdk {
            tag,
            target,
            swift,
            index_url,
        } => cmd::sdk::sdk(&ctx, tag.as_deref(), target.as_deref(), &swift, &index_url)
            .await
            .map(|_| ()),
        Commands::Nightly {
            token,
            releases_url,
            prefix,
            install,
        } => cmd::nightly::nightly(&ctx, token.as_deref(), &releases_url, &prefix, install)
            .await
            .map(|_| ()),
    }
}
