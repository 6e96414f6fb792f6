//! # Command Execution Module / 命令执行模块
//!
//! The process-execution and debug-launch collaborators. Commands are shell
//! strings run from a workspace root with the workspace environment; run
//! mode enforces a timeout, debug mode does not.
//!
//! 进程执行与调试启动协作者。命令是在工作区根目录下、使用工作区环境变量运行的
//! shell 字符串；运行模式强制超时，调试模式则不会。

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::error::ExecError;

/// Captured output of a process that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a test command to completion.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Runs `command` in `cwd`. Fails with `Timeout` when it outlives `timeout`
    /// (the process is killed) and with `NonZeroExit` when it exits unsuccessfully.
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError>;
}

/// Starts a command under a debugger. Never subject to a timeout.
#[async_trait]
pub trait DebugLauncher: Send + Sync {
    async fn launch(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ExecError>;
}

/// Builds a platform shell invocation for `command`.
pub fn shell_command(command: &str) -> Result<Command, ExecError> {
    if command.trim().is_empty() {
        return Err(ExecError::EmptyCommand);
    }

    #[cfg(windows)]
    let cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };

    Ok(cmd)
}

async fn read_lines<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut output = String::new();
    if let Some(reader) = reader {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            output.push_str(&line);
            output.push('\n');
        }
    }
    output
}

/// Spawns a command and captures its stdout and stderr separately.
/// Both streams are drained concurrently with waiting for the exit status,
/// so dropping the returned future drops (and, with `kill_on_drop`, kills) the child.
///
/// 派生一个命令并分别捕获其 stdout 和 stderr。
/// 两个输出流与等待退出状态并发进行，因此丢弃返回的 future 会丢弃（并在
/// `kill_on_drop` 下终止）子进程。
pub async fn spawn_and_capture(
    mut cmd: Command,
) -> Result<(ExitStatus, ExecOutput), std::io::Error> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) =
        futures::join!(read_lines(stdout), read_lines(stderr), child.wait());

    Ok((status?, ExecOutput { stdout, stderr }))
}

/// Runs commands through the platform shell with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

#[async_trait]
impl ProcessExecutor for ShellExecutor {
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        let mut cmd = shell_command(command)?;
        cmd.kill_on_drop(true).current_dir(cwd).envs(env);

        debug!(command, cwd = %cwd.display(), "executing");
        let (status, output) = match tokio::time::timeout(timeout, spawn_and_capture(cmd)).await {
            Ok(result) => result?,
            Err(_) => {
                info!(command, timeout_secs = timeout.as_secs(), "process timed out");
                return Err(ExecError::Timeout { timeout });
            }
        };

        if status.success() {
            Ok(output)
        } else {
            Err(ExecError::NonZeroExit {
                code: status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

/// Launches the command in the foreground with the terminal attached, so an
/// interactive debugger such as `rdbg` can take over stdin/stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellDebugLauncher;

#[async_trait]
impl DebugLauncher for ShellDebugLauncher {
    async fn launch(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), ExecError> {
        let mut cmd = shell_command(command)?;
        cmd.current_dir(cwd)
            .envs(env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd.status().await?;
        debug!(command, code = ?status.code(), "debug session ended");
        Ok(())
    }
}
