//! Helpers for running the `dirdex` binary
//!
//! Every command runs with its own XDG state and config directories so
//! lock files never leak between tests or into the user's account.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct DirdexCommand {
    binary_path: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl DirdexCommand {
    /// A command whose state lives under `sandbox`
    pub fn new(sandbox: impl AsRef<Path>) -> Self {
        let sandbox = sandbox.as_ref();
        let mut env = HashMap::new();
        env.insert(
            "XDG_STATE_HOME".to_string(),
            sandbox.join("state").display().to_string(),
        );
        env.insert(
            "XDG_CONFIG_HOME".to_string(),
            sandbox.join("config").display().to_string(),
        );
        env.insert("RUST_LOG".to_string(), "warn".to_string());

        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_dirdex")),
            args: Vec::new(),
            env,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command.args(&self.args).envs(&self.env);
        command
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output: Output = self.command().output().context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Start without waiting; used for a foreground server
    pub fn spawn(&self) -> Result<Child> {
        self.command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn command")
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

/// Ask the OS for a port nobody is listening on
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// dirdex!(sandbox, "get", "foo", "--port", &port).execute()?;
/// ```
#[macro_export]
macro_rules! dirdex {
    ($sandbox:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::DirdexCommand::new($sandbox);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
