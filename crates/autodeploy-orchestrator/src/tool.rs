use std::fmt;

/// External command-line tools the orchestrator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Docker,
    Kubectl,
    Helm,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Docker, Tool::Kubectl, Tool::Helm];

    /// Program name looked up on `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            Tool::Docker => "docker",
            Tool::Kubectl => "kubectl",
            Tool::Helm => "helm",
        }
    }

    pub fn install_hint(self) -> &'static str {
        match self {
            Tool::Docker => "https://docs.docker.com/get-docker/",
            Tool::Kubectl => "https://kubernetes.io/docs/tasks/tools/",
            Tool::Helm => "https://helm.sh/docs/intro/install/",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Flags whose value must never reach logs or error messages.
const SENSITIVE_FLAGS: &[&str] = &["--token", "--password"];

/// Copy of `args` with credential flag values replaced.
///
/// Handles both `--token=value` and `--token value` forms.
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;

    for arg in args {
        if hide_next {
            redacted.push("[REDACTED]".to_owned());
            hide_next = false;
            continue;
        }
        match arg.split_once('=') {
            Some((flag, _)) if SENSITIVE_FLAGS.contains(&flag) => {
                redacted.push(format!("{flag}=[REDACTED]"));
            }
            _ => {
                hide_next = SENSITIVE_FLAGS.contains(&arg.as_str());
                redacted.push(arg.clone());
            }
        }
    }
    redacted
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found, install: {hint}", hint = .tool.install_hint())]
    NotFound { tool: Tool, source: std::io::Error },

    #[error("{tool} command failed: {args:?}\n{stderr}")]
    CommandFailed {
        tool: Tool,
        args: Vec<String>,
        stderr: String,
    },

    #[error("{tool} output was not valid UTF-8")]
    InvalidUtf8 {
        tool: Tool,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to write to {tool} stdin")]
    StdinWrite { tool: Tool, source: std::io::Error },
}

impl ToolError {
    /// Failure for `args`, with credentials already redacted.
    pub fn failed(tool: Tool, args: &[String], stderr: impl Into<String>) -> Self {
        ToolError::CommandFailed {
            tool,
            args: redact_args(args),
            stderr: stderr.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn redacts_inline_token() {
        let args = owned(&["config", "set-credentials", "u", "--token=abc123"]);
        assert_eq!(
            redact_args(&args),
            owned(&["config", "set-credentials", "u", "--token=[REDACTED]"])
        );
    }

    #[test]
    fn redacts_separate_value() {
        let args = owned(&["login", "--password", "hunter2", "registry"]);
        assert_eq!(
            redact_args(&args),
            owned(&["login", "--password", "[REDACTED]", "registry"])
        );
    }

    #[test]
    fn password_stdin_is_not_a_value_flag() {
        let args = owned(&["login", "--password-stdin", "registry.example.com"]);
        assert_eq!(redact_args(&args), args);
    }

    #[test]
    fn failed_error_hides_token() {
        let err = ToolError::failed(
            Tool::Kubectl,
            &owned(&["config", "set-credentials", "u", "--token=abc123"]),
            "boom",
        );
        let message = err.to_string();
        assert!(message.starts_with("kubectl command failed"));
        assert!(!message.contains("abc123"));
    }
}
