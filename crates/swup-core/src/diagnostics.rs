//! Crash diagnostics collection.
//!
//! When the SDK installer dies we gather whatever core dumps the host left
//! behind, copy them into one staging directory and hand that directory to
//! the host's artifact upload. Every step is best-effort: a failing source is
//! logged as a warning and the remaining sources still run. Nothing here can
//! fail the run on its own.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use walkdir::WalkDir;

use crate::host::{Host, UploadRequest};
use crate::process::{CommandSpec, ExitOutcome, ProcessRunner};

/// Artifact name of the uploaded bundle (also the staging directory name).
pub const BUNDLE_NAME: &str = "swift-crash-diagnostics";
/// Days the host keeps the uploaded bundle.
pub const RETENTION_DAYS: u32 = 7;
/// How deep the core file scan descends below each root.
pub const MAX_SCAN_DEPTH: usize = 4;
/// Where systemd-coredump stores cores.
pub const SYSTEMD_COREDUMP_DIR: &str = "/var/lib/systemd/coredump";
/// File name pattern of core files.
pub const CORE_PATTERN: &str = "core*";

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("failed to run `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("`{tool}` finished with {status}")]
    ToolFailed {
        tool: &'static str,
        status: ExitOutcome,
    },

    #[error("invalid core file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("upload failed: {0}")]
    Upload(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One place core dumps may turn up.
#[async_trait]
pub trait DiagnosticSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Return candidate files. `scratch` is a private directory the source
    /// may write into; it lives until staging is done.
    async fn probe(&self, scratch: &Path) -> Result<Vec<PathBuf>, DiagnosticsError>;
}

/// Asks systemd-coredump for the most recent core of `process`.
pub struct CoredumpctlSource {
    process: String,
    runner: Arc<dyn ProcessRunner>,
}

impl CoredumpctlSource {
    pub fn new(process: impl Into<String>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            process: process.into(),
            runner,
        }
    }
}

#[async_trait]
impl DiagnosticSource for CoredumpctlSource {
    fn name(&self) -> &str {
        "coredumpctl"
    }

    async fn probe(&self, scratch: &Path) -> Result<Vec<PathBuf>, DiagnosticsError> {
        let output_path = scratch.join(format!("core.{}.coredumpctl", self.process));
        let spec = CommandSpec::new("coredumpctl")
            .args(["dump", self.process.as_str(), "--output"])
            .arg(output_path.to_string_lossy());

        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|source| DiagnosticsError::Spawn {
                tool: "coredumpctl",
                source,
            })?;

        let non_empty = fs::metadata(&output_path).is_ok_and(|m| m.len() > 0);
        if output.status.success() && non_empty {
            return Ok(vec![output_path]);
        }

        // coredumpctl may leave an empty file behind when it finds nothing.
        let _ = fs::remove_file(&output_path);
        if output.status.success() {
            Ok(Vec::new())
        } else {
            Err(DiagnosticsError::ToolFailed {
                tool: "coredumpctl",
                status: output.status,
            })
        }
    }
}

/// Walks a set of directories for files named like core dumps.
#[derive(Debug, Clone)]
pub struct CoreFileScan {
    roots: Vec<PathBuf>,
    max_depth: usize,
    pattern: String,
    exclude: Vec<PathBuf>,
}

impl CoreFileScan {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            max_depth: MAX_SCAN_DEPTH,
            pattern: CORE_PATTERN.to_string(),
            exclude: Vec::new(),
        }
    }

    /// Never descend into `dir`.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn scan(&self, scratch: &Path) -> Result<Vec<PathBuf>, DiagnosticsError> {
        let pattern = glob::Pattern::new(&self.pattern)?;
        let mut found = Vec::new();

        for root in &self.roots {
            let walker = WalkDir::new(root)
                .max_depth(self.max_depth)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| {
                    let path = e.path();
                    !path.starts_with(scratch) && !self.exclude.iter().any(|x| path.starts_with(x))
                });

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let denied = e
                            .io_error()
                            .is_some_and(|io| io.kind() == io::ErrorKind::PermissionDenied);
                        if !denied {
                            tracing::debug!("skipping during core scan: {e}");
                        }
                        continue;
                    }
                };
                if entry.file_type().is_file()
                    && entry.file_name().to_str().is_some_and(|n| pattern.matches(n))
                {
                    found.push(entry.into_path());
                }
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl DiagnosticSource for CoreFileScan {
    fn name(&self) -> &str {
        "core file scan"
    }

    async fn probe(&self, scratch: &Path) -> Result<Vec<PathBuf>, DiagnosticsError> {
        let scan = self.clone();
        let scratch = scratch.to_path_buf();
        tokio::task::spawn_blocking(move || scan.scan(&scratch))
            .await
            .map_err(|e| DiagnosticsError::Io(io::Error::other(e)))?
    }
}

/// A file copied into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// What a collection run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsBundle {
    pub staging_dir: PathBuf,
    pub files: Vec<StagedFile>,
    /// Location reported by the host upload, if the upload went through.
    pub upload: Option<String>,
}

impl DiagnosticsBundle {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Where to point a human: the upload if there was one, else the
    /// staging directory.
    pub fn location(&self) -> String {
        self.upload
            .clone()
            .unwrap_or_else(|| self.staging_dir.display().to_string())
    }
}

/// First free name for `file_name` in `dir`: `name`, `name.1`, `name.2`, ...
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let first = dir.join(file_name);
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{file_name}.{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Copy `source` into `staging_dir` under a collision-free name.
///
/// # Errors
///
/// Returns [`DiagnosticsError::Stage`] if the copy fails.
pub fn stage_file(source: &Path, staging_dir: &Path) -> Result<StagedFile, DiagnosticsError> {
    let file_name = source
        .file_name()
        .map_or_else(|| "core".to_string(), |n| n.to_string_lossy().into_owned());
    let dest = unique_destination(staging_dir, &file_name);
    fs::copy(source, &dest).map_err(|e| DiagnosticsError::Stage {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok(StagedFile {
        source: source.to_path_buf(),
        dest,
    })
}

/// Copy every candidate into `staging_dir`, creating it first.
///
/// A candidate that fails to copy is reported in the second list and does
/// not stop the rest.
///
/// # Errors
///
/// [`DiagnosticsError::Io`] if the staging directory cannot be created.
pub fn stage_all(
    candidates: &[PathBuf],
    staging_dir: &Path,
) -> Result<(Vec<StagedFile>, Vec<DiagnosticsError>), DiagnosticsError> {
    fs::create_dir_all(staging_dir)?;
    let mut staged = Vec::new();
    let mut failures = Vec::new();
    for candidate in candidates {
        match stage_file(candidate, staging_dir) {
            Ok(file) => staged.push(file),
            Err(e) => failures.push(e),
        }
    }
    Ok((staged, failures))
}

/// Runs every [`DiagnosticSource`], stages the results and uploads them.
pub struct DiagnosticsCollector {
    sources: Vec<Box<dyn DiagnosticSource>>,
    staging_dir: PathBuf,
    host: Arc<dyn Host>,
}

impl std::fmt::Debug for DiagnosticsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsCollector")
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

impl DiagnosticsCollector {
    /// A collector with no sources.
    pub fn new(staging_dir: impl Into<PathBuf>, host: Arc<dyn Host>) -> Self {
        Self {
            sources: Vec::new(),
            staging_dir: staging_dir.into(),
            host,
        }
    }

    pub fn with_source(mut self, source: Box<dyn DiagnosticSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// The standard setup for a crashed `process` run from `work_dir`:
    /// coredumpctl (Linux only), then a scan of the working directory, the
    /// temp directory and the systemd coredump directory.
    pub fn for_process(
        process: &str,
        work_dir: &Path,
        runner: Arc<dyn ProcessRunner>,
        host: Arc<dyn Host>,
    ) -> Self {
        let staging_dir = work_dir.join(BUNDLE_NAME);
        let mut collector = Self::new(&staging_dir, host);

        if cfg!(target_os = "linux") {
            collector = collector.with_source(Box::new(CoredumpctlSource::new(process, runner)));
        }

        let scan = CoreFileScan::new(vec![
            work_dir.to_path_buf(),
            std::env::temp_dir(),
            PathBuf::from(SYSTEMD_COREDUMP_DIR),
        ])
        .excluding(&staging_dir);
        collector.with_source(Box::new(scan))
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Gather, stage and upload. Never fails; problems become warnings.
    pub async fn collect(&self) -> DiagnosticsBundle {
        let mut bundle = DiagnosticsBundle {
            staging_dir: self.staging_dir.clone(),
            ..DiagnosticsBundle::default()
        };

        let scratch = match tempfile::Builder::new().prefix("swup-diag-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                self.host
                    .warning(&format!("Could not create diagnostics scratch directory: {e}"));
                return bundle;
            }
        };

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for source in &self.sources {
            match source.probe(scratch.path()).await {
                Ok(paths) => {
                    self.host
                        .debug(&format!("{}: {} candidate(s)", source.name(), paths.len()));
                    for path in paths {
                        let identity = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
                        if seen.insert(identity) {
                            candidates.push(path);
                        }
                    }
                }
                Err(e) => self.host.warning(&format!("{}: {e}", source.name())),
            }
        }

        if !candidates.is_empty() {
            let staging_dir = self.staging_dir.clone();
            let staged = tokio::task::spawn_blocking(move || stage_all(&candidates, &staging_dir))
                .await
                .map_err(|e| DiagnosticsError::Io(io::Error::other(e)))
                .and_then(|staged| staged);
            match staged {
                Ok((files, failures)) => {
                    for e in failures {
                        self.host.warning(&e.to_string());
                    }
                    bundle.files = files;
                }
                Err(e) => {
                    self.host.warning(&e.to_string());
                    return bundle;
                }
            }
        }

        if bundle.is_empty() {
            self.host.warning("No crash diagnostics were found.");
            return bundle;
        }

        let request = UploadRequest {
            name: BUNDLE_NAME.to_string(),
            root: self.staging_dir.clone(),
            files: bundle.files.iter().map(|f| f.dest.clone()).collect(),
            retention_days: RETENTION_DAYS,
        };
        match self.host.upload_artifact(&request).await {
            Ok(location) => bundle.upload = Some(location),
            Err(e) => self
                .host
                .warning(&DiagnosticsError::Upload(e).to_string()),
        }

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Level, MemoryHost};
    use crate::process::ProcessOutput;
    use tempfile::tempdir;

    struct FixedSource(Vec<PathBuf>);

    #[async_trait]
    impl DiagnosticSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn probe(&self, _: &Path) -> Result<Vec<PathBuf>, DiagnosticsError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DiagnosticSource for FailingSource {
        fn name(&self) -> &str {
            "broken"
        }
        async fn probe(&self, _: &Path) -> Result<Vec<PathBuf>, DiagnosticsError> {
            Err(DiagnosticsError::Io(io::Error::other("boom")))
        }
    }

    #[tokio::test]
    async fn test_same_core_name_from_two_roots_is_staged_twice() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(a.path().join("core.1234"), b"first").unwrap();
        fs::create_dir_all(b.path().join("nested")).unwrap();
        fs::write(b.path().join("nested/core.1234"), b"second").unwrap();

        let host = Arc::new(MemoryHost::new().accepting_uploads());
        let staging = work.path().join(BUNDLE_NAME);
        let scan = CoreFileScan::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        let collector = DiagnosticsCollector::new(&staging, host.clone()).with_source(Box::new(scan));

        let bundle = collector.collect().await;

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.files[0].dest, staging.join("core.1234"));
        assert_eq!(bundle.files[1].dest, staging.join("core.1234.1"));
        assert_eq!(fs::read(staging.join("core.1234")).unwrap(), b"first");
        assert_eq!(fs::read(staging.join("core.1234.1")).unwrap(), b"second");

        let uploads = host.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, BUNDLE_NAME);
        assert_eq!(uploads[0].retention_days, RETENTION_DAYS);
        assert_eq!(bundle.upload.as_deref(), Some("memory://swift-crash-diagnostics"));
    }

    #[tokio::test]
    async fn test_scan_skips_staging_dir_and_non_matching_files() {
        let work = tempdir().unwrap();
        let staging = work.path().join(BUNDLE_NAME);
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("core.1"), b"old").unwrap();
        fs::write(work.path().join("core.2"), b"new").unwrap();
        fs::write(work.path().join("main.swift"), b"print()").unwrap();

        let scan = CoreFileScan::new(vec![work.path().to_path_buf()]).excluding(&staging);
        let scratch = tempdir().unwrap();
        let found = scan.probe(scratch.path()).await.unwrap();
        assert_eq!(found, vec![work.path().join("core.2")]);
    }

    #[tokio::test]
    async fn test_scan_respects_depth() {
        let root = tempdir().unwrap();
        let deep = root.path().join("a/b/c/d/e");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("core"), b"x").unwrap();

        let scratch = tempdir().unwrap();
        let scan = CoreFileScan::new(vec![root.path().to_path_buf()]);
        assert!(scan.probe(scratch.path()).await.unwrap().is_empty());
        let found = scan.max_depth(6).probe(scratch.path()).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_found_warns_and_skips_upload() {
        let work = tempdir().unwrap();
        let host = Arc::new(MemoryHost::new().accepting_uploads());
        let collector = DiagnosticsCollector::new(work.path().join(BUNDLE_NAME), host.clone())
            .with_source(Box::new(FailingSource))
            .with_source(Box::new(FixedSource(vec![])));

        let bundle = collector.collect().await;

        assert!(bundle.is_empty());
        assert!(host.uploads().is_empty());
        let warnings = host.messages(Level::Warning);
        assert!(warnings.iter().any(|w| w.starts_with("broken:")));
        assert!(warnings.iter().any(|w| w.contains("No crash diagnostics")));
    }

    #[tokio::test]
    async fn test_duplicate_candidates_are_staged_once_and_upload_failure_warns() {
        let dir = tempdir().unwrap();
        let core = dir.path().join("core.7");
        fs::write(&core, b"x").unwrap();
        let host = Arc::new(MemoryHost::new());
        let staging = dir.path().join(BUNDLE_NAME);
        let collector = DiagnosticsCollector::new(&staging, host.clone())
            .with_source(Box::new(FixedSource(vec![core.clone()])))
            .with_source(Box::new(FixedSource(vec![core.clone()])));

        let bundle = collector.collect().await;

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.upload, None);
        assert_eq!(bundle.location(), staging.display().to_string());
        assert!(
            host.messages(Level::Warning)
                .iter()
                .any(|w| w.starts_with("upload failed"))
        );
    }

    struct CoredumpctlFake {
        write: bool,
        code: i32,
    }

    #[async_trait]
    impl ProcessRunner for CoredumpctlFake {
        async fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
            assert_eq!(spec.program, "coredumpctl");
            let out = spec.args.last().unwrap();
            if self.write {
                fs::write(out, b"core")?;
            } else {
                fs::write(out, b"")?;
            }
            Ok(ProcessOutput {
                status: ExitOutcome::Code(self.code),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_coredumpctl_source() {
        let scratch = tempdir().unwrap();

        let hit = CoredumpctlSource::new("swift", Arc::new(CoredumpctlFake { write: true, code: 0 }));
        let found = hit.probe(scratch.path()).await.unwrap();
        assert_eq!(found, vec![scratch.path().join("core.swift.coredumpctl")]);

        let miss = CoredumpctlSource::new("swift", Arc::new(CoredumpctlFake { write: false, code: 1 }));
        let err = miss.probe(scratch.path()).await.unwrap_err();
        assert!(matches!(err, DiagnosticsError::ToolFailed { .. }));
        assert!(!scratch.path().join("core.swift.coredumpctl").exists());
    }

    #[test]
    fn test_stage_all_keeps_going_past_a_missing_file() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(src.path().join("core.1"), b"one").unwrap();
        fs::write(src.path().join("core.2"), b"two").unwrap();
        let staging = work.path().join(BUNDLE_NAME);

        let (staged, failures) = stage_all(
            &[
                src.path().join("core.1"),
                src.path().join("core.gone"),
                src.path().join("core.2"),
            ],
            &staging,
        )
        .unwrap();

        assert_eq!(staged.len(), 2);
        assert_eq!(fs::read(staging.join("core.2")).unwrap(), b"two");
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            DiagnosticsError::Stage { ref path, .. } if path.ends_with("core.gone")
        ));
    }

    #[tokio::test]
    async fn test_unusable_staging_dir_warns_and_skips_upload() {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(src.path().join("core.7"), b"dump").unwrap();
        let staging = work.path().join(BUNDLE_NAME);
        fs::write(&staging, b"in the way").unwrap();

        let host = Arc::new(MemoryHost::new().accepting_uploads());
        let collector = DiagnosticsCollector::new(&staging, host.clone())
            .with_source(Box::new(CoreFileScan::new(vec![src.path().to_path_buf()])));

        let bundle = collector.collect().await;
        assert!(bundle.is_empty());
        assert!(host.uploads().is_empty());
        assert_eq!(host.messages(Level::Warning).len(), 1);
    }

    #[test]
    fn test_unique_destination_counts_up() {
        let dir = tempdir().unwrap();
        assert_eq!(unique_destination(dir.path(), "core"), dir.path().join("core"));
        fs::write(dir.path().join("core"), b"").unwrap();
        fs::write(dir.path().join("core.1"), b"").unwrap();
        assert_eq!(unique_destination(dir.path(), "core"), dir.path().join("core.2"));
    }
}
