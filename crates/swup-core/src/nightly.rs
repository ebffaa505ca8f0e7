//! Latest nightly snapshot lookup.
//!
//! Releases are listed newest first, one page at a time. [`find_latest`]
//! pulls pages only until it sees a matching tag, so a match on an early
//! page never costs a request for later ones.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Tag prefix of nightly toolchain snapshots.
pub const NIGHTLY_PREFIX: &str = "swift-wasm-DEVELOPMENT-SNAPSHOT-";

/// Release listing of the toolchain repository.
pub const RELEASES_API: &str = "https://api.github.com/repos/swiftwasm/swift/releases";

const PER_PAGE: u32 = 100;

/// The part of a release record we care about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// A lazy, finite sequence of release pages.
#[async_trait]
pub trait ReleasePages: Send {
    /// The next page, or `None` once the listing is exhausted.
    async fn next_page(&mut self) -> Result<Option<Vec<Release>>>;
}

/// Return the first tag (newest first) that starts with `prefix`.
///
/// # Errors
///
/// [`Error::NotFound`] if the pages run out without a match, or whatever
/// error the page source reports.
pub async fn find_latest<P>(pages: &mut P, prefix: &str) -> Result<String>
where
    P: ReleasePages + ?Sized,
{
    while let Some(page) = pages.next_page().await? {
        if let Some(release) = page.into_iter().find(|r| r.tag_name.starts_with(prefix)) {
            return Ok(release.tag_name);
        }
    }
    Err(Error::NotFound(prefix.to_string()))
}

async fn fetch_page(request: reqwest::RequestBuilder, url: &str) -> Result<(Vec<Release>, Option<String>)> {
    let response = request
        .header(USER_AGENT, crate::USER_AGENT)
        .header(ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::network(url, e))?;

    let next = response
        .headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(next_link);
    let body = response.text().await.map_err(|e| Error::network(url, e))?;
    let releases = serde_json::from_str(&body).map_err(|e| Error::parse("release listing", e))?;
    Ok((releases, next))
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| matches!(p.trim(), r#"rel="next""# | "rel=next"));
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

/// Token-authenticated listing that follows `Link: rel="next"` headers.
#[derive(Debug)]
pub struct AuthenticatedPages {
    client: Client,
    token: String,
    next_url: Option<String>,
}

impl AuthenticatedPages {
    pub fn new(client: Client, url: &str, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            next_url: Some(format!("{url}?per_page={PER_PAGE}")),
        }
    }
}

#[async_trait]
impl ReleasePages for AuthenticatedPages {
    async fn next_page(&mut self) -> Result<Option<Vec<Release>>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        tracing::debug!(%url, "fetching release page");
        let request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));
        let (releases, next) = fetch_page(request, &url).await?;
        self.next_url = next;
        Ok(Some(releases))
    }
}

/// Anonymous listing paged with `?page=N`; an empty page ends it.
#[derive(Debug)]
pub struct PollingPages {
    client: Client,
    url: String,
    page: u32,
    exhausted: bool,
}

impl PollingPages {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            page: 1,
            exhausted: false,
        }
    }
}

#[async_trait]
impl ReleasePages for PollingPages {
    async fn next_page(&mut self) -> Result<Option<Vec<Release>>> {
        if self.exhausted {
            return Ok(None);
        }
        let url = format!("{}?per_page={PER_PAGE}&page={}", self.url, self.page);
        tracing::debug!(%url, "fetching release page");
        let (releases, _) = fetch_page(self.client.get(&url), &url).await?;
        self.page += 1;
        if releases.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(releases))
    }
}
