//! Error handling module for cryptauth
//!
//! Provides the error taxonomy for authentication-method management using thiserror.
//! Every variant is terminal for the current action: nothing in the crate retries the
//! underlying tool after one of these is returned.

use serde::Serialize;
use thiserror::Error;

/// Main error type for cryptauth
#[derive(Error, Debug)]
pub enum AuthError {
    /// Caller-correctable request problems, raised before any process is spawned
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status output did not contain the expected header or summary line
    #[error("Malformed output from `{command}`: {reason}")]
    MalformedOutput { command: String, reason: String },

    /// The tool rejected the supplied secret (sentinel exit code)
    #[error("{message}")]
    WrongSecret {
        message: String,
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Any other non-zero exit of the tool
    #[error("{message}")]
    ToolExecution {
        message: String,
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// An interactive prompt never appeared within the prompt timeout
    #[error("Timed out after {timeout_secs}s waiting for {pattern:?} from `{command}`")]
    PromptTimeout {
        command: String,
        pattern: String,
        timeout_secs: u64,
        transcript: String,
    },

    /// IO errors (spawning, pipes, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pseudo-terminal setup errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Configuration errors (loading, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cryptauth operations
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::WrongSecret { .. } => "wrong_secret",
            Self::ToolExecution { .. } => "tool_execution",
            Self::PromptTimeout { .. } => "prompt_timeout",
            Self::Io(_) => "io",
            Self::Terminal(_) => "terminal",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
        }
    }

    /// The command line that was attempted, if the error happened after one was built.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Self::MalformedOutput { command, .. }
            | Self::WrongSecret { command, .. }
            | Self::ToolExecution { command, .. }
            | Self::PromptTimeout { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Flatten the error into the record printed by the binary.
    pub fn to_report(&self) -> FailureReport {
        let (exit_code, stdout, stderr) = match self {
            Self::WrongSecret {
                exit_code,
                stdout,
                stderr,
                ..
            } => (Some(*exit_code), stdout.clone(), stderr.clone()),
            Self::ToolExecution {
                exit_code,
                stdout,
                stderr,
                ..
            } => (*exit_code, stdout.clone(), stderr.clone()),
            Self::PromptTimeout { transcript, .. } => (None, transcript.clone(), String::new()),
            _ => (None, String::new(), String::new()),
        };

        FailureReport {
            failed: true,
            changed: false,
            kind: self.kind(),
            message: self.to_string(),
            command_line: self.command_line().unwrap_or_default().to_string(),
            exit_code,
            stdout,
            stderr,
        }
    }
}

/// Failure record emitted on stdout when an action does not complete.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub failed: bool,
    pub changed: bool,
    pub kind: &'static str,
    pub message: String,
    pub command_line: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}
