use std::process::Stdio;

use crate::tool::{redact_args, Tool, ToolError};

/// Abstraction over external tool execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
/// Arguments are passed as a vector and never through a shell.
#[allow(async_fn_in_trait)]
pub trait ToolExecutor: Send + Sync {
    /// Execute a command and capture stdout.
    async fn exec(&self, tool: Tool, args: &[String]) -> Result<String, ToolError>;

    /// Execute a command, streaming output to the terminal.
    async fn exec_streaming(&self, tool: Tool, args: &[String]) -> Result<(), ToolError>;

    /// Execute a command with data piped to stdin.
    async fn exec_with_stdin(
        &self,
        tool: Tool,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, ToolError>;
}

/// Executor spawning the real binaries.
///
/// Children are killed when the returned future is dropped, so abandoning a
/// wait or a deploy does not leave stray processes behind.
pub struct RealExecutor;

fn command(tool: Tool, args: &[String]) -> tokio::process::Command {
    tracing::debug!(tool = %tool, args = ?redact_args(args), "running");
    let mut cmd = tokio::process::Command::new(tool.program());
    cmd.args(args).kill_on_drop(true);
    cmd
}

fn captured(tool: Tool, args: &[String], output: std::process::Output) -> Result<String, ToolError> {
    if output.status.success() {
        String::from_utf8(output.stdout).map_err(|e| ToolError::InvalidUtf8 { tool, source: e })
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Err(ToolError::failed(tool, args, stderr))
    }
}

/// Failure detail for a streamed command, whose stderr went to the terminal.
fn exit_detail(status: std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

impl ToolExecutor for RealExecutor {
    async fn exec(&self, tool: Tool, args: &[String]) -> Result<String, ToolError> {
        let output = command(tool, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ToolError::NotFound { tool, source: e })?;

        captured(tool, args, output)
    }

    async fn exec_streaming(&self, tool: Tool, args: &[String]) -> Result<(), ToolError> {
        let status = command(tool, args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ToolError::NotFound { tool, source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::failed(tool, args, exit_detail(status)))
        }
    }

    async fn exec_with_stdin(
        &self,
        tool: Tool,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, ToolError> {
        use tokio::io::AsyncWriteExt;

        let mut child = command(tool, args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::NotFound { tool, source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| ToolError::StdinWrite { tool, source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| ToolError::StdinWrite { tool, source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ToolError::NotFound { tool, source: e })?;

        captured(tool, args, output)
    }
}
