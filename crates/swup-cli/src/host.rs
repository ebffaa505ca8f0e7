//! GitHub Actions host adapter.
//!
//! Inputs come from `INPUT_<NAME>` variables, the execution path and step
//! outputs are appended to the files named by `GITHUB_PATH` and
//! `GITHUB_OUTPUT`. Outside a runner those files are absent and both fall
//! back to plain lines on stdout.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use swup_core::host::{Host, UploadRequest};

/// Output the staged diagnostics directory is published under.
pub const DIAGNOSTICS_OUTPUT: &str = "diagnostics-path";

#[derive(Debug, Clone, Default)]
pub struct ActionsHost {
    path_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    workflow_commands: bool,
}

impl ActionsHost {
    /// Configure from the runner environment.
    pub fn from_env() -> Self {
        let file = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            path_file: file("GITHUB_PATH"),
            output_file: file("GITHUB_OUTPUT"),
            workflow_commands: std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true"),
        }
    }

    pub fn new(path_file: Option<PathBuf>, output_file: Option<PathBuf>) -> Self {
        Self {
            path_file,
            output_file,
            workflow_commands: false,
        }
    }

    fn command(&self, name: &str, msg: &str) {
        if self.workflow_commands {
            println!("::{name}::{}", escape_data(msg));
        }
    }
}

/// Environment variable holding input `name`.
pub fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Escape a workflow command message.
fn escape_data(msg: &str) -> String {
    msg.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// One `GITHUB_OUTPUT` record; multi-line values use the heredoc form.
fn output_record(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let delimiter = format!("swup_delimiter_{}", std::process::id());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

fn append(path: &Path, record: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(record.as_bytes())
}

#[async_trait]
impl Host for ActionsHost {
    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::warn!("{msg}");
        self.command("warning", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
        self.command("error", msg);
    }

    fn get_input(&self, name: &str) -> Option<String> {
        std::env::var(input_variable(name))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn add_path(&self, dir: &Path) -> io::Result<()> {
        match &self.path_file {
            Some(file) => append(file, &format!("{}\n", dir.display())),
            None => {
                println!("{}", dir.display());
                Ok(())
            }
        }
    }

    fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        let record = output_record(name, value);
        match &self.output_file {
            Some(file) => append(file, &record),
            None => {
                print!("{record}");
                Ok(())
            }
        }
    }

    async fn upload_artifact(&self, request: &UploadRequest) -> io::Result<String> {
        // A later workflow step does the actual upload from this path.
        let root = request.root.display().to_string();
        self.set_output(DIAGNOSTICS_OUTPUT, &root)?;
        tracing::info!(
            name = %request.name,
            files = request.files.len(),
            retention_days = request.retention_days,
            "diagnostics staged for upload"
        );
        Ok(root)
    }
}
