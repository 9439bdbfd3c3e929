//! Per-action workflows.
//!
//! [`Orchestrator::execute`] runs one intent end to end:
//!
//! 1. `lslv <resource>` when existence checking is enabled
//! 2. `hdcryptmgr showlv <resource> -v`, parsed into facts
//! 3. idempotency short-circuits (`initialize` on an initialized resource,
//!    `unlock` on an unlocked one)
//! 4. command building and validation
//! 5. a plain or scripted-terminal run
//! 6. exit code classification into an [`ActionReport`] or an [`AuthError`]

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builder::{BuiltCommand, CommandBuilder, CommandIntent};
use crate::commands::status::{ResourceExistsArgs, ShowStatusArgs};
use crate::config::ToolConfig;
use crate::error::{AuthError, Result};
use crate::facts::{self, ResourceAuthState};
use crate::prompt::{PromptScriptKind, DEFAULT_INIT_METHOD_NAME};
use crate::runner::ToolRunner;
use crate::tool_traits::{command_line, ToolArgs};
use crate::types::Action;

pub const MSG_ALREADY_INITIALIZED: &str = "No need to initialize, the LV is already initialized.";
pub const MSG_ALREADY_UNLOCKED: &str = "The provided device is already unlocked.";
pub const MSG_STATUS_FAILED: &str = "Could not get the details about current authentication methods.";

/// Outcome of a completed action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub changed: bool,
    pub message: String,
    /// Empty when no mutating command ran
    pub command_line: String,
    /// 0 for both a successful run and a no-op
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ActionReport {
    fn unchanged(message: &str) -> Self {
        Self {
            changed: false,
            message: message.to_string(),
            ..Self::default()
        }
    }
}

/// What a finished run of the built command produced.
struct RunResult {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Sequences facts, building and execution for one resource at a time.
pub struct Orchestrator<R: ToolRunner> {
    runner: R,
    config: ToolConfig,
    builder: CommandBuilder,
}

impl<R: ToolRunner> Orchestrator<R> {
    pub fn new(runner: R, config: ToolConfig) -> Self {
        let builder = CommandBuilder::new(config.tool_path.clone());
        Self {
            runner,
            config,
            builder,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `intent` against the live resource state.
    pub fn execute(&self, intent: &CommandIntent) -> Result<ActionReport> {
        if intent.resource.trim().is_empty() {
            return Err(AuthError::validation("You need to provide the device to operate on."));
        }

        info!("Action {} on {}", intent.action, intent.resource);

        if self.config.verify_resource {
            self.ensure_resource_exists(&intent.resource)?;
        }

        let state = self.query_state(&intent.resource)?;
        self.execute_with_state(intent, &state)
    }

    /// Fail unless `lslv` knows the resource.
    pub fn ensure_resource_exists(&self, resource: &str) -> Result<()> {
        let argv = ResourceExistsArgs {
            resource: resource.to_string(),
        }
        .argv(&self.config.lslv_path);

        let output = self.runner.run(&argv)?;
        if output.success() {
            Ok(())
        } else {
            Err(AuthError::validation(format!(
                "The provided device({}) is not valid.",
                resource
            )))
        }
    }

    /// Read and parse the current authentication facts for `resource`.
    pub fn query_state(&self, resource: &str) -> Result<ResourceAuthState> {
        let argv = ShowStatusArgs {
            resource: resource.to_string(),
        }
        .argv(&self.config.tool_path);
        let command = command_line(&argv);

        let output = self.runner.run(&argv)?;
        if !output.success() {
            return Err(AuthError::ToolExecution {
                message: MSG_STATUS_FAILED.to_string(),
                command,
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        facts::parse(resource, &output.stdout).map_err(|e| AuthError::MalformedOutput {
            command,
            reason: e.to_string(),
        })
    }

    /// Run `intent` against already known facts.
    pub fn execute_with_state(&self, intent: &CommandIntent, state: &ResourceAuthState) -> Result<ActionReport> {
        match intent.action {
            Action::Initialize if state.initialized => {
                info!("{} is already initialized", intent.resource);
                return Ok(ActionReport::unchanged(MSG_ALREADY_INITIALIZED));
            }
            Action::Unlock if state.initialized && !state.locked => {
                info!("{} is already unlocked", intent.resource);
                return Ok(ActionReport::unchanged(MSG_ALREADY_UNLOCKED));
            }
            _ => {}
        }

        let built = self.builder.build(intent, state)?;
        let command = built.command_line();

        let run = self.run_built(intent, &built)?;

        match run.exit_code {
            Some(0) => {
                let message = format!(
                    "{}, command: {}. Action({}) completed successfully.",
                    success_text(intent.action),
                    command,
                    intent.action
                );
                info!("{}", message);
                Ok(ActionReport {
                    changed: built.mutating,
                    message,
                    command_line: command,
                    exit_code: 0,
                    stdout: run.stdout,
                    stderr: run.stderr,
                })
            }
            Some(code) if code == self.config.wrong_secret_exit_code && rejects_secret(&built) => {
                warn!("{} rejected the secret (exit code {})", command, code);
                Err(AuthError::WrongSecret {
                    message: wrong_secret_text(intent.action).to_string(),
                    command,
                    exit_code: code,
                    stdout: run.stdout,
                    stderr: run.stderr,
                })
            }
            exit_code => {
                warn!("{} failed with exit code {:?}", command, exit_code);
                Err(AuthError::ToolExecution {
                    message: format!(
                        "The following command failed: {}. Check stderr for more information.",
                        command
                    ),
                    command,
                    exit_code,
                    stdout: run.stdout,
                    stderr: run.stderr,
                })
            }
        }
    }

    fn run_built(&self, intent: &CommandIntent, built: &BuiltCommand) -> Result<RunResult> {
        let Some(kind) = built.prompt_kind.filter(|_| built.needs_interactive) else {
            let output = self.runner.run(&built.argv)?;
            return Ok(RunResult {
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        };

        let secret = intent
            .secret
            .as_ref()
            .ok_or_else(|| AuthError::validation("You need to provide a secret for this authentication method."))?;

        let method_name = match (intent.action, intent.method_name.as_deref()) {
            (Action::Initialize, None) => Some(DEFAULT_INIT_METHOD_NAME),
            (_, name) => name,
        };

        debug!("Running {} interactively with the {} script", built.action, kind);
        let outcome = self
            .runner
            .run_interactive(&built.argv, secret, kind, method_name)?;

        Ok(RunResult {
            exit_code: Some(outcome.exit_code),
            stdout: outcome.transcript,
            stderr: String::new(),
        })
    }
}

fn success_text(action: Action) -> &'static str {
    match action {
        Action::Initialize => "Successfully initialized authentication method",
        Action::Add => "Successfully added authentication method",
        Action::Delete => "Successfully deleted the authentication method",
        Action::Unlock => "Successfully unlocked the authentication method",
        Action::Check => "Successfully checked the authentication method",
    }
}

/// Only the lockout scripts turn the sentinel code into a wrong-secret outcome.
fn rejects_secret(built: &BuiltCommand) -> bool {
    built.needs_interactive && built.prompt_kind.is_some_and(PromptScriptKind::exhausts_retries)
}

fn wrong_secret_text(action: Action) -> &'static str {
    match action {
        Action::Delete => "Could not delete the auth method, incorrect password provided.",
        Action::Unlock => {
            "Could not unlock the device using the provided auth method, incorrect password provided."
        }
        Action::Check => "Could not check the auth method, incorrect password provided.",
        Action::Initialize | Action::Add => "The provided password was rejected.",
    }
}
