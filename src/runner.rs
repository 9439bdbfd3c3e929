//! Tool Process Execution
//!
//! Every `hdcryptmgr`/`lslv` invocation goes through a [`ToolRunner`]. The
//! orchestrator only ever sees exit codes and captured output, which lets tests
//! substitute a scripted runner for the real binaries.
//!
//! [`SystemRunner`] is the production implementation:
//!
//! - plain runs spawn the child in a new process group with stdin closed,
//! - interactive runs go through the pseudo-terminal [`SessionDriver`],
//! - both register the child PID with `ChildRegistry::global()` while it runs.

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::config::ToolConfig;
use crate::error::{AuthError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::prompt::PromptScriptKind;
use crate::secret::Secret;
use crate::session::{ExecutionOutcome, SessionDriver};
use crate::tool_traits::command_line;

/// Captured result of a non-interactive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// None if the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The "run an external command" capability.
pub trait ToolRunner {
    /// Run `argv` to completion without a terminal and capture its output.
    fn run(&self, argv: &[String]) -> Result<ToolOutput>;

    /// Run `argv` under a scripted terminal session that types `secret`.
    fn run_interactive(
        &self,
        argv: &[String],
        secret: &Secret,
        kind: PromptScriptKind,
        method_name: Option<&str>,
    ) -> Result<ExecutionOutcome>;
}

/// Runs the real binaries.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    driver: SessionDriver,
}

impl SystemRunner {
    pub fn new(driver: SessionDriver) -> Self {
        Self { driver }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(SessionDriver::new(
            config.prompts.clone(),
            config.prompt_timeout(),
            config.wrong_secret_exit_code,
        ))
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> Result<ToolOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AuthError::validation("Cannot run an empty command"))?;

        info!("Running: {}", command_line(argv));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let output = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = output?;
        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        debug!("{} exited with {:?}", program, result.exit_code);
        Ok(result)
    }

    fn run_interactive(
        &self,
        argv: &[String],
        secret: &Secret,
        kind: PromptScriptKind,
        method_name: Option<&str>,
    ) -> Result<ExecutionOutcome> {
        self.driver.run(argv, secret, kind, method_name)
    }
}
