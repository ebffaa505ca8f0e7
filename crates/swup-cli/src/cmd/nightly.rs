//! `swup nightly`

use anyhow::{Result, anyhow};
use swup_core::locator::ReleaseLocation;
use swup_core::nightly::{AuthenticatedPages, PollingPages, ReleasePages, find_latest};

use super::{Context, toolchain};

/// Output naming the newest nightly tag.
pub const NIGHTLY_OUTPUT: &str = "nightly-tag";

pub async fn nightly(
    ctx: &Context,
    token: Option<&str>,
    releases_url: &str,
    prefix: &str,
    install: bool,
) -> Result<String> {
    let mut pages: Box<dyn ReleasePages> = match ctx.flag_or_input(token, "github-token") {
        Some(token) => Box::new(AuthenticatedPages::new(ctx.client.clone(), releases_url, token)),
        None => {
            ctx.host
                .debug("No token configured; paging the release listing anonymously");
            Box::new(PollingPages::new(ctx.client.clone(), releases_url))
        }
    };
    let tag = find_latest(&mut *pages, prefix).await?;

    ctx.host.info(&format!("Latest nightly: {tag}"));
    ctx.host.set_output(NIGHTLY_OUTPUT, &tag)?;

    if install {
        let version = ReleaseLocation::default()
            .version_from_tag(&tag)
            .ok_or_else(|| anyhow!("Nightly tag {tag} does not name a toolchain release"))?;
        toolchain::toolchain(ctx, Some(version), None).await?;
    }
    Ok(tag)
}
