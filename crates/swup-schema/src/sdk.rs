//! Swift SDK build manifests served by the SDK index.
//!
//! The wire shape is `{"swift-sdks": {"<target>": {"id", "url", "checksum"}}}`.
//! Descriptors are strict: unknown or missing fields fail deserialization
//! instead of being papered over.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One installable SDK artifact for a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdkDescriptor {
    /// SDK identifier as reported by `swift sdk list`.
    pub id: String,
    /// Download URL of the artifact bundle.
    pub url: String,
    /// Expected checksum, verified by the installer.
    pub checksum: String,
}

/// Build manifest for a single toolchain tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// SDKs keyed by target name (e.g. `wasm32-unknown-wasi`).
    #[serde(rename = "swift-sdks")]
    pub swift_sdks: BTreeMap<String, SdkDescriptor>,
}

impl BuildManifest {
    /// Target names present in this build, in sorted order.
    pub fn targets(&self) -> Vec<&str> {
        self.swift_sdks.keys().map(String::as_str).collect()
    }
}
