//! `swup sdk`

use std::path::Path;

use anyhow::{Context as _, Result};
use swup_core::diagnostics::DiagnosticsCollector;
use swup_core::sdk::{SdkIndexClient, select_target};
use swup_core::sdk_install::SdkInstaller;

use super::Context;

/// Output naming the installed SDK.
pub const SDK_OUTPUT: &str = "sdk-id";

/// Target installed when neither flag nor input name one.
pub const DEFAULT_TARGET: &str = "wasm32-unknown-wasi";

pub async fn sdk(
    ctx: &Context,
    tag: Option<&str>,
    target: Option<&str>,
    swift: &str,
    index_url: &str,
) -> Result<String> {
    let tag = ctx.flag_or_input(tag, "tag");
    let target = ctx
        .flag_or_input(target, "target")
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());

    let index = SdkIndexClient::new(
        ctx.client.clone(),
        index_url,
        ctx.runner.clone(),
        ctx.host.clone(),
    )
    .with_swift(swift);
    let tag = index.resolve_tag(tag.as_deref()).await?;
    let build = index.fetch_build(&tag).await?;
    let sdk = select_target(&build, &target)?;
    ctx.host
        .info(&format!("Installing Swift SDK {} for {target}", sdk.id));

    // coredumpctl matches on the executable name, not the path.
    let process = Path::new(swift)
        .file_name()
        .map_or_else(|| swift.to_string(), |n| n.to_string_lossy().into_owned());
    let collector = DiagnosticsCollector::for_process(
        &process,
        &ctx.work_dir,
        ctx.runner.clone(),
        ctx.host.clone(),
    );
    SdkInstaller::new(ctx.runner.clone(), ctx.host.clone(), collector)
        .with_swift(swift)
        .install(&sdk.url, &sdk.checksum)
        .await
        .with_context(|| format!("Failed to install Swift SDK {} ({tag})", sdk.id))?;

    ctx.host.set_output(SDK_OUTPUT, &sdk.id)?;
    Ok(sdk.id)
}
