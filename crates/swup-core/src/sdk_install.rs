//! Target SDK installation through `swift sdk install`.

use std::sync::Arc;

use crate::diagnostics::DiagnosticsCollector;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::process::{CommandSpec, ProcessRunner};

pub struct SdkInstaller {
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn Host>,
    swift: String,
    collector: DiagnosticsCollector,
}

impl std::fmt::Debug for SdkInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkInstaller")
            .field("swift", &self.swift)
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}

impl SdkInstaller {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        host: Arc<dyn Host>,
        collector: DiagnosticsCollector,
    ) -> Self {
        Self {
            runner,
            host,
            swift: "swift".to_string(),
            collector,
        }
    }

    pub fn with_swift(mut self, swift: impl Into<String>) -> Self {
        self.swift = swift.into();
        self
    }

    /// The command that installs the SDK at `url`.
    pub fn command(&self, url: &str, checksum: &str) -> CommandSpec {
        CommandSpec::new(&self.swift)
            .args(["sdk", "install", url, "--checksum", checksum])
            .unlimited_core_dumps()
            .inherit_stdio()
    }

    /// Install the SDK at `url`, verifying `checksum`.
    ///
    /// # Errors
    ///
    /// [`Error::Subprocess`] if the installer cannot be started or exits
    /// unsuccessfully. Crash diagnostics are collected first and attached.
    pub async fn install(&self, url: &str, checksum: &str) -> Result<()> {
        let spec = self.command(url, checksum);
        self.host.info(&format!("Running `{spec}`"));

        let reason = match self.runner.run(&spec).await {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => output.status.to_string(),
            Err(e) => format!("could not start: {e}"),
        };

        self.host
            .error(&format!("`{spec}` failed ({reason}); collecting crash diagnostics"));
        let bundle = self.collector.collect().await;
        self.host.info(&format!(
            "Collected {} diagnostic file(s) at {}",
            bundle.len(),
            bundle.location()
        ));

        Err(Error::Subprocess {
            command: spec.to_string(),
            reason,
            diagnostics: Some(Box::new(bundle)),
        })
    }
}
