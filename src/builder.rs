//! Command building with validation against current facts.
//!
//! [`CommandBuilder::build`] turns a sparse [`CommandIntent`] into a validated
//! argument vector. All rules are checked before any argv is produced and the
//! first violation wins, so the same bad request always yields the same message.
//!
//! # Validation Order
//!
//! 1. Resource identifier present
//! 2. Resource initialized (except `initialize`; `add` has its own message)
//! 3. `delete`/`check`: name or index given
//! 4. `delete`/`check`: index exists
//! 5. `delete`/`check`: name exists
//! 6. `add`: name unused
//! 7. `add`: at most one `pks` method
//! 8. `add`: `keyfile` has a detail
//! 9. `unlock`: auto protection excludes type and detail
//! 10. Method type present where the action needs one
//! 11. `delete`/`unlock`/`check`: `keyfile` has a detail
//! 12. Passphrase paths carry a secret

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::commands::auth::{AuthAddArgs, AuthCheckArgs, AuthDeleteArgs, AuthInitArgs, AuthUnlockArgs};
use crate::error::{AuthError, Result};
use crate::facts::ResourceAuthState;
use crate::prompt::PromptScriptKind;
use crate::secret::Secret;
use crate::tool_traits::{command_line, ToolArgs};
use crate::types::{Action, IntentFlag, MethodType};

/// What the caller wants done to one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIntent {
    pub action: Action,
    pub resource: String,
    pub method_type: Option<MethodType>,
    pub method_name: Option<String>,
    pub method_detail: Option<String>,
    pub method_index: Option<String>,
    pub secret: Option<Secret>,
    pub flags: BTreeSet<IntentFlag>,
}

impl CommandIntent {
    pub fn new(action: Action, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: resource.into(),
            method_type: None,
            method_name: None,
            method_detail: None,
            method_index: None,
            secret: None,
            flags: BTreeSet::new(),
        }
    }

    pub fn with_type(mut self, method_type: MethodType) -> Self {
        self.method_type = Some(method_type);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.method_name = Some(name.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.method_detail = Some(detail.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.method_index = Some(index.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_flag(mut self, flag: IntentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn has_flag(&self, flag: IntentFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Method type the tool will actually use; `authinit` always creates a passphrase.
    pub fn effective_method_type(&self) -> Option<MethodType> {
        match self.action {
            Action::Initialize => Some(MethodType::Passphrase),
            _ => self.method_type,
        }
    }

    /// Whether the tool will prompt for a secret on its terminal.
    pub fn needs_secret(&self) -> bool {
        self.effective_method_type()
            .is_some_and(MethodType::prompts_for_secret)
    }
}

/// Validated invocation produced by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub action: Action,
    pub argv: Vec<String>,
    /// Whether a successful run changes the resource
    pub mutating: bool,
    /// True when the command must run under a scripted terminal session
    pub needs_interactive: bool,
    /// Script to drive the session with, when interactive
    pub prompt_kind: Option<PromptScriptKind>,
}

impl BuiltCommand {
    pub fn command_line(&self) -> String {
        command_line(&self.argv)
    }

    /// Resource identifier, always the last argument.
    pub fn resource(&self) -> &str {
        self.argv.last().map(String::as_str).unwrap_or_default()
    }
}

/// Produces argv for `hdcryptmgr` from intents.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tool_path: PathBuf,
}

impl CommandBuilder {
    pub fn new(tool_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }

    /// Validate `intent` against `state` and emit the command.
    pub fn build(&self, intent: &CommandIntent, state: &ResourceAuthState) -> Result<BuiltCommand> {
        validate(intent, state)?;

        let resource = intent.resource.clone();
        let detail = intent.method_detail.clone();
        let name = intent.method_name.clone();
        let index = intent.method_index.clone();

        if intent.has_flag(IntentFlag::Force) && intent.action != Action::Delete {
            debug!("Force flag has no effect on {}, ignoring", intent.action);
        }
        if intent.has_flag(IntentFlag::AutoProtection) && intent.action != Action::Unlock {
            debug!("Auto protection flag has no effect on {}, ignoring", intent.action);
        }

        // validate() guarantees a method type wherever one is unwrapped below
        let (argv, mutating) = match (intent.action, intent.method_type) {
            (Action::Initialize, _) => self.emit(AuthInitArgs { resource, detail, name }),
            (Action::Add, Some(method_type)) => self.emit(AuthAddArgs {
                resource,
                method_type,
                detail,
                name,
            }),
            (Action::Delete, Some(method_type)) => self.emit(AuthDeleteArgs {
                resource,
                method_type,
                detail,
                index,
                name,
                force: intent.has_flag(IntentFlag::Force),
            }),
            (Action::Unlock, method_type) => self.emit(AuthUnlockArgs {
                resource,
                method_type,
                detail,
                auto_protection: intent.has_flag(IntentFlag::AutoProtection),
            }),
            (Action::Check, Some(method_type)) => self.emit(AuthCheckArgs {
                resource,
                method_type,
                detail,
                index,
                name,
            }),
            (action, None) => {
                return Err(AuthError::validation(format!(
                    "You need to specify the type of authentication method for action={}.",
                    action
                )));
            }
        };

        let needs_interactive = intent.needs_secret();
        let prompt_kind = needs_interactive.then(|| {
            let strong = intent.secret.as_ref().is_some_and(Secret::is_strong);
            PromptScriptKind::for_action(intent.action, strong)
        });

        debug!(
            "Built {} command: {} (interactive={})",
            intent.action,
            command_line(&argv),
            needs_interactive
        );

        Ok(BuiltCommand {
            action: intent.action,
            argv,
            mutating,
            needs_interactive,
            prompt_kind,
        })
    }

    fn emit<A: ToolArgs>(&self, args: A) -> (Vec<String>, bool) {
        (args.argv(&self.tool_path), args.is_mutating())
    }
}

fn fail<T>(msg: impl Into<String>) -> Result<T> {
    Err(AuthError::validation(msg))
}

fn validate(intent: &CommandIntent, state: &ResourceAuthState) -> Result<()> {
    let action = intent.action;
    let resource = intent.resource.as_str();

    if resource.trim().is_empty() {
        return fail("The resource identifier must not be empty.");
    }

    if action != Action::Initialize && !state.initialized {
        return match action {
            Action::Add => fail(format!(
                "cannot add before initialization: {} is uninitialized.",
                resource
            )),
            _ => fail(format!(
                "{} is uninitialized, there are no authentication methods to {}.",
                resource, action
            )),
        };
    }

    if action.targets_existing_method() {
        if intent.method_name.is_none() && intent.method_index.is_none() {
            return fail(format!(
                "You need to either provide the name or index of the method that you want to {}.",
                action
            ));
        }
        if let Some(index) = intent.method_index.as_deref() {
            if !state.has_index(index) {
                return fail(format!(
                    "The provided method index {} does not exist for {}.",
                    index, resource
                ));
            }
        }
        if let Some(name) = intent.method_name.as_deref() {
            if !state.has_name(name) {
                return fail(format!(
                    "The provided method name {} does not exist for {}.",
                    name, resource
                ));
            }
        }
    }

    if action == Action::Add {
        if let Some(name) = intent.method_name.as_deref() {
            if state.has_name(name) {
                return fail(format!(
                    "The provided method name {} is already present, use a different one.",
                    name
                ));
            }
        }
        if intent.method_type == Some(MethodType::Pks) && state.has_method_type(MethodType::Pks) {
            return fail("A pks authentication method already exists, cannot add a new one.");
        }
        if intent.method_type == Some(MethodType::Keyfile) && intent.method_detail.is_none() {
            return fail("You need to provide the key file's location in method detail for keyfile methods.");
        }
    }

    let auto = intent.has_flag(IntentFlag::AutoProtection);
    if action == Action::Unlock
        && auto
        && (intent.method_type.is_some() || intent.method_detail.is_some())
    {
        return fail("Cannot use method type or method detail when auto key protection is set.");
    }

    match action {
        Action::Initialize => {
            if intent.method_type.is_some_and(|t| t != MethodType::Passphrase) {
                return fail("initialize only creates passphrase methods.");
            }
        }
        Action::Unlock if auto => {}
        _ => {
            if intent.method_type.is_none() {
                return fail(format!(
                    "You need to specify the type of authentication method for action={}.",
                    action
                ));
            }
        }
    }

    if matches!(action, Action::Delete | Action::Unlock | Action::Check)
        && intent.method_type == Some(MethodType::Keyfile)
        && intent.method_detail.is_none()
    {
        return fail("You need to provide the key file's location in method detail for keyfile methods.");
    }

    if intent.needs_secret() && intent.secret.is_none() {
        return fail(format!(
            "You need to provide a secret for passphrase methods (action={}).",
            action
        ));
    }

    Ok(())
}
