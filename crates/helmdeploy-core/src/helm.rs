//! Driver for the `helm` command line
//!
//! Every goal eventually shells out to helm. Commands are plain argument
//! vectors executed without a shell; secrets are passed on stdin where helm
//! supports it and are masked whenever a command is displayed.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{CoreError, Result};

/// Default bound on a single helm invocation
pub const DEFAULT_HELM_TIMEOUT: Duration = Duration::from_secs(300);

/// Flags whose following argument is a secret
const SECRET_FLAGS: [&str; 1] = ["--password"];

/// A helm invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmCommand {
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Data written to helm's stdin (e.g. a registry password)
    pub stdin: Option<String>,
}

impl HelmCommand {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            args: Vec::new(),
            working_dir: working_dir.into(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// `helm repo add <name> <url> [--username U --password P] [--pass-credentials] [--force-update]`
    pub fn repo_add(
        working_dir: &Path,
        name: &str,
        url: &str,
        credentials: Option<(&str, &str)>,
        pass_credentials: bool,
        force_update: bool,
    ) -> Self {
        let mut cmd = Self::new(working_dir).args(["repo", "add", name, url]);
        if let Some((username, password)) = credentials {
            cmd = cmd.args(["--username", username, "--password", password]);
        }
        if pass_credentials {
            cmd = cmd.arg("--pass-credentials");
        }
        if force_update {
            cmd = cmd.arg("--force-update");
        }
        cmd
    }

    /// `helm registry login <host> --username U --password-stdin`
    pub fn registry_login(working_dir: &Path, host: &str, username: &str, password: &str) -> Self {
        Self::new(working_dir)
            .args(["registry", "login", host, "--username", username, "--password-stdin"])
            .stdin(password)
    }

    /// `helm push <archive> <remote>`
    pub fn push(working_dir: &Path, archive: &Path, remote: &str) -> Self {
        Self::new(working_dir)
            .args(["push"])
            .arg(archive.to_string_lossy())
            .arg(remote)
    }

    /// `helm dependency update`
    pub fn dependency_update(chart_dir: &Path) -> Self {
        Self::new(chart_dir).args(["dependency", "update"])
    }

    /// `helm package <chart> --version <version> [--app-version <app>]`
    pub fn package(helm_dir: &Path, chart: &str, version: &str, app_version: Option<&str>) -> Self {
        let mut cmd = Self::new(helm_dir).args(["package", chart, "--version", version]);
        if let Some(app) = app_version {
            cmd = cmd.args(["--app-version", app]);
        }
        cmd
    }

    /// `helm lint <chart> [--strict] [--values F]...`
    pub fn lint(helm_dir: &Path, chart: &str, strict: bool, values: &[PathBuf]) -> Self {
        let mut cmd = Self::new(helm_dir).args(["lint", chart]);
        if strict {
            cmd = cmd.arg("--strict");
        }
        for file in values {
            cmd = cmd.arg("--values").arg(file.to_string_lossy());
        }
        cmd
    }

    /// `helm template [--values F]... <chart>`
    pub fn template(helm_dir: &Path, chart: &str, values: &[PathBuf]) -> Self {
        let mut cmd = Self::new(helm_dir).arg("template");
        for file in values {
            cmd = cmd.arg("--values").arg(file.to_string_lossy());
        }
        cmd.arg(chart)
    }

    /// Command line for logs and errors, secrets masked
    pub fn display(&self) -> String {
        let mut parts = vec!["helm".to_string()];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("****".to_string());
                mask_next = false;
            } else {
                mask_next = SECRET_FLAGS.contains(&arg.as_str());
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Captured output of a successful helm run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelmOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl HelmOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Executes helm commands
#[async_trait]
pub trait HelmRunner: Send + Sync {
    /// Run a command; a non-zero exit is an error
    async fn run(&self, command: &HelmCommand) -> Result<HelmOutput>;
}

/// Runs the real helm binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    executable: PathBuf,
    timeout: Duration,
}

impl HelmCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: DEFAULT_HELM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new("helm")
    }
}

#[async_trait]
impl HelmRunner for HelmCli {
    async fn run(&self, command: &HelmCommand) -> Result<HelmOutput> {
        let shown = command.display();
        tracing::debug!("Executing '{}' in '{}'", shown, command.working_dir.display());

        let mut child = tokio::process::Command::new(&self.executable)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::HelmSpawn {
                program: self.executable.display().to_string(),
                source,
            })?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CoreError::HelmTimeout {
                command: shown.clone(),
                seconds: self.timeout.as_secs(),
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code().unwrap_or(-1);
        tracing::debug!("When executing '{}', result was {}", shown, code);

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("Output: {}", line);
        }

        if !output.status.success() {
            for line in stderr.lines() {
                tracing::error!("Output: {}", line);
            }
            return Err(CoreError::HelmFailed {
                command: shown,
                code,
                stderr,
            });
        }

        for line in stderr.lines() {
            tracing::warn!("Output: {}", line);
        }

        Ok(HelmOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}
