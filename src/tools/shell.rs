//! Shell execution tool
//!
//! The command gate runs before anything is spawned. Allowed commands run
//! with the privileges of this process, a bounded timeout and a bounded
//! output buffer.

use super::result::{parse_args, success, Failure, ToolResult};
use super::schema::{ParamSpec, ParamType};
use super::traits::{AgentTool, ToolCategory};
use crate::config::ShellConfig;
use crate::security::command_gate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Either stream hit the output cap
    pub truncated: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("command timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("failed to collect command output: {0}")]
    Io(#[from] std::io::Error),
}

/// Process execution collaborator
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, RunError>;
}

/// Runs through the platform shell on this machine
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCommandRunner;

/// Read to EOF keeping at most `limit` bytes; the rest is drained and dropped
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((kept, truncated))
}

#[async_trait]
impl CommandRunner for LocalCommandRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, RunError> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&spec.command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&spec.command);
            cmd
        };
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(RunError::Spawn)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = spec.max_output_bytes;

        let collect = async {
            let (out, err, status) = tokio::join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                child.wait()
            );
            let (out, out_truncated) = out?;
            let (err, err_truncated) = err?;
            Ok::<_, RunError>(CommandOutput {
                exit_code: status?.code(),
                stdout: String::from_utf8_lossy(&out).to_string(),
                stderr: String::from_utf8_lossy(&err).to_string(),
                truncated: out_truncated || err_truncated,
            })
        };

        let result = tokio::time::timeout(spec.timeout, collect).await;
        match result {
            Ok(output) => output,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out command: {}", e);
                }
                Err(RunError::Timeout(spec.timeout))
            }
        }
    }
}

#[derive(Deserialize)]
struct BashArgs {
    command: String,
    timeout: u64,
    cwd: Option<PathBuf>,
}

pub struct BashTool {
    runner: Arc<dyn CommandRunner>,
    config: ShellConfig,
}

impl BashTool {
    pub fn new(runner: Arc<dyn CommandRunner>, config: ShellConfig) -> Self {
        Self {
            runner,
            config: config.clamped(),
        }
    }
}

#[async_trait]
impl AgentTool for BashTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Run a shell command on the user's machine and return its exit code, stdout and stderr. \
         Destructive commands (recursive deletes, disk formatting, fork bombs) are refused."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Shell
    }

    fn is_side_effect(&self) -> bool {
        true
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("command", "Shell command to execute", ParamType::String),
            ParamSpec::optional(
                "timeout",
                "Timeout in milliseconds (capped at 120000)",
                ParamType::Integer {
                    min: Some(1),
                    max: None,
                },
            )
            .with_default(self.config.default_timeout_ms),
            ParamSpec::optional("cwd", "Working directory", ParamType::String),
        ]
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: BashArgs = parse_args(args)?;

        if let Some(rule) = command_gate::find_blocking_rule(&args.command) {
            tracing::warn!("Blocked command by rule {}: {}", rule.name, args.command);
            return Err(Failure::new(format!(
                "Command blocked for safety: {} (matched pattern `{}`)",
                rule.description, rule.pattern
            ))
            .with_suggestion("Use a narrower, non-destructive command or ask the user to run it")
            .retryable(false));
        }

        let timeout_ms = args.timeout.clamp(1, self.config.max_timeout_ms);
        let spec = CommandSpec {
            command: args.command,
            cwd: args.cwd.or_else(|| self.config.working_dir.clone()),
            timeout: Duration::from_millis(timeout_ms),
            max_output_bytes: self.config.max_output_bytes,
        };
        tracing::info!("Running command ({}ms timeout): {}", timeout_ms, spec.command);

        let output = match self.runner.run(spec).await {
            Ok(output) => output,
            Err(RunError::Timeout(_)) => {
                return Err(Failure::new(format!(
                    "Command timed out after {}ms and was terminated",
                    timeout_ms
                ))
                .with_suggestion(format!(
                    "Pass a longer timeout (up to {}ms) or split the work into shorter commands",
                    self.config.max_timeout_ms
                ))
                .retryable(true))
            }
            Err(e) => {
                return Err(Failure::new(e.to_string())
                    .with_suggestion("Check that the working directory exists and the shell is available"))
            }
        };

        if !output.success() {
            let code = output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(Failure::new(format!("Command exited with code {}", code))
                .with_suggestion("Read stderr for the cause before retrying")
                .with_details(json!({
                    "exitCode": output.exit_code,
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                    "truncated": output.truncated,
                })));
        }

        success(
            "Command completed with exit code 0",
            serde_json::to_value(&output).unwrap_or_default(),
        )
    }
}
