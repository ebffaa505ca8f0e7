//! SDK index client.
//!
//! The index maps a toolchain fingerprint (first line of `swift --version`)
//! to a build tag, and each tag to a manifest listing one SDK per target:
//!
//! - `<base>/tag-by-version.json`: `{"<fingerprint>": "<tag>"}`
//! - `<base>/builds/<tag>.json`: see [`BuildManifest`]

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use swup_schema::{BuildManifest, SdkDescriptor};

use crate::error::{Error, Result};
use crate::host::Host;
use crate::process::{CommandSpec, ProcessRunner};

pub const DEFAULT_SDK_INDEX_URL: &str =
    "https://raw.githubusercontent.com/swiftwasm/swift-sdk-index/main/v1";

pub struct SdkIndexClient {
    client: Client,
    base_url: String,
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn Host>,
    swift: String,
}

impl std::fmt::Debug for SdkIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkIndexClient")
            .field("base_url", &self.base_url)
            .field("swift", &self.swift)
            .finish_non_exhaustive()
    }
}

impl SdkIndexClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            runner,
            host,
            swift: "swift".to_string(),
        }
    }

    /// Use a specific `swift` executable for the toolchain fingerprint.
    pub fn with_swift(mut self, swift: impl Into<String>) -> Self {
        self.swift = swift.into();
        self
    }

    /// The build tag to install SDKs from.
    ///
    /// An explicit tag is returned as-is; otherwise the installed
    /// toolchain's fingerprint is looked up in the index.
    ///
    /// # Errors
    ///
    /// [`Error::Subprocess`] if `swift --version` cannot be run,
    /// [`Error::IndexLookup`] if the fingerprint is unknown, plus the
    /// transport errors of the index fetch.
    pub async fn resolve_tag(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(tag) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            self.host.debug(&format!("Using SDK build tag from input: {tag}"));
            return Ok(tag.to_string());
        }

        let fingerprint = self.toolchain_fingerprint().await?;
        self.host
            .debug(&format!("Toolchain fingerprint: {fingerprint}"));

        let url = format!("{}/tag-by-version.json", self.base_url);
        let tags: HashMap<String, String> = self.get_json(&url, "tag-by-version.json").await?;
        let tag = tags
            .get(&fingerprint)
            .cloned()
            .ok_or(Error::IndexLookup(fingerprint))?;
        self.host.debug(&format!("Resolved SDK build tag: {tag}"));
        Ok(tag)
    }

    /// Fetch the build manifest for `tag`.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] on transport failure or a non-success status,
    /// [`Error::Parse`] if the manifest is malformed.
    pub async fn fetch_build(&self, tag: &str) -> Result<BuildManifest> {
        let url = format!("{}/builds/{tag}.json", self.base_url);
        self.get_json(&url, &format!("build manifest for {tag}")).await
    }

    async fn toolchain_fingerprint(&self) -> Result<String> {
        let spec = CommandSpec::new(&self.swift).arg("--version");
        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| Error::Subprocess {
                command: spec.to_string(),
                reason: e.to_string(),
                diagnostics: None,
            })?;
        if !output.status.success() {
            return Err(Error::Subprocess {
                command: spec.to_string(),
                reason: output.status.to_string(),
                diagnostics: None,
            });
        }

        output
            .stdout
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::parse(format!("`{spec}` output"), "no version line"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let body = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::network(url, e))?
            .text()
            .await
            .map_err(|e| Error::network(url, e))?;
        serde_json::from_str(&body).map_err(|e| Error::parse(what, e))
    }
}

/// Pick the SDK for `target` from `build`.
///
/// # Errors
///
/// [`Error::Configuration`] naming `target` and the targets that do exist.
pub fn select_target(build: &BuildManifest, target: &str) -> Result<SdkDescriptor> {
    build
        .swift_sdks
        .get(target)
        .cloned()
        .ok_or_else(|| Error::Configuration {
            target: target.to_string(),
            available: build.targets().into_iter().map(str::to_string).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use crate::process::{ExitOutcome, ProcessOutput};
    use async_trait::async_trait;
    use mockito::Server;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FINGERPRINT: &str = "Swift version 5.10-dev (LLVM 1a2b3c, Swift 4d5e6f)";

    struct FakeSwift {
        stdout: String,
        calls: AtomicUsize,
    }

    impl FakeSwift {
        fn new(stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                stdout: stdout.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeSwift {
        async fn run(&self, spec: &CommandSpec) -> std::io::Result<ProcessOutput> {
            assert_eq!(spec.args, vec!["--version".to_string()]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProcessOutput {
                status: ExitOutcome::Code(0),
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn manifest() -> BuildManifest {
        serde_json::from_str(
            r#"{"swift-sdks": {
                "wasm32-unknown-wasi": {"id": "wasi-sdk", "url": "https://x/wasi.zip", "checksum": "aa"},
                "wasm32-unknown-wasip1-threads": {"id": "threads-sdk", "url": "https://x/t.zip", "checksum": "bb"}
            }}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_explicit_tag_skips_lookup() {
        let swift = FakeSwift::new(FINGERPRINT);
        let client = SdkIndexClient::new(
            Client::new(),
            "http://127.0.0.1:1",
            swift.clone(),
            Arc::new(NullHost),
        );
        let tag = client.resolve_tag(Some("swift-wasm-6.0-RELEASE")).await.unwrap();
        assert_eq!(tag, "swift-wasm-6.0-RELEASE");
        assert_eq!(swift.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_tag_from_fingerprint() {
        let mut server = Server::new_async().await;
        let body = format!(r#"{{"{FINGERPRINT}": "swift-wasm-5.10-SNAPSHOT"}}"#);
        let _m = server
            .mock("GET", "/v1/tag-by-version.json")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let swift = FakeSwift::new(&format!("{FINGERPRINT}\nTarget: x86_64-unknown-linux-gnu\n"));
        let client = SdkIndexClient::new(
            Client::new(),
            format!("{}/v1/", server.url()),
            swift,
            Arc::new(NullHost),
        );
        assert_eq!(
            client.resolve_tag(None).await.unwrap(),
            "swift-wasm-5.10-SNAPSHOT"
        );
    }

    #[tokio::test]
    async fn test_unknown_fingerprint_is_index_lookup_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/tag-by-version.json")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = SdkIndexClient::new(
            Client::new(),
            server.url(),
            FakeSwift::new(FINGERPRINT),
            Arc::new(NullHost),
        );
        let err = client.resolve_tag(None).await.unwrap_err();
        assert!(matches!(err, Error::IndexLookup(ref f) if f == FINGERPRINT));
    }

    #[tokio::test]
    async fn test_fetch_build() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("GET", "/builds/swift-wasm-6.0-RELEASE.json")
            .with_status(200)
            .with_body(
                r#"{"swift-sdks": {"wasm32-unknown-wasi": {"id": "i", "url": "u", "checksum": "c"}}}"#,
            )
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/builds/nope.json")
            .with_status(404)
            .create_async()
            .await;
        let _bad = server
            .mock("GET", "/builds/bad.json")
            .with_status(200)
            .with_body(r#"{"swift-sdks": {"wasm32-unknown-wasi": {"id": "i"}}}"#)
            .create_async()
            .await;

        let client = SdkIndexClient::new(
            Client::new(),
            server.url(),
            FakeSwift::new(FINGERPRINT),
            Arc::new(NullHost),
        );

        let build = client.fetch_build("swift-wasm-6.0-RELEASE").await.unwrap();
        assert_eq!(build.targets(), vec!["wasm32-unknown-wasi"]);
        assert!(matches!(
            client.fetch_build("nope").await.unwrap_err(),
            Error::Network { .. }
        ));
        assert!(matches!(
            client.fetch_build("bad").await.unwrap_err(),
            Error::Parse { .. }
        ));
    }

    #[test]
    fn test_select_target() {
        let build = manifest();
        let sdk = select_target(&build, "wasm32-unknown-wasi").unwrap();
        assert_eq!(sdk, build.swift_sdks["wasm32-unknown-wasi"]);

        let err = select_target(&build, "wasm32-unknown-emscripten").unwrap_err();
        match err {
            Error::Configuration { target, available } => {
                assert_eq!(target, "wasm32-unknown-emscripten");
                assert_eq!(
                    available,
                    vec!["wasm32-unknown-wasi", "wasm32-unknown-wasip1-threads"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
