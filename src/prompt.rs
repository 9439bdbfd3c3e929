//! Prompt scripts for interactive tool sessions.
//!
//! `hdcryptmgr` reads passphrases from its controlling terminal, so secret-bearing
//! actions are driven as a scripted conversation. The conversation is data, not
//! control flow: a [`PromptCatalog`] holds one [`PromptTemplate`] per
//! [`PromptScriptKind`], and a template is rendered into an immutable
//! [`PromptScript`] for a single invocation. Supporting a new tool version means
//! editing table rows (or the JSON config), never the session driver.
//!
//! # Placeholders
//!
//! | Token        | Replaced with |
//! |--------------|---------------|
//! | `{resource}` | Resource identifier (last argv element) |
//! | `{secret}`   | The caller's secret |
//! | `{name}`     | Method name the tool will report |

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::secret::{Secret, REDACTED};
use crate::types::Action;

/// Name the tool gives the passphrase created by `authinit` when none is supplied.
pub const DEFAULT_INIT_METHOD_NAME: &str = "initpwd";

/// Value typed at retry prompts to exhaust the tool's attempt limit.
pub const EXHAUST_RESPONSE: &str = "wrong";

/// Which template to render for an interactive invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PromptScriptKind {
    InitWeak,
    InitStrong,
    AddWeak,
    AddStrong,
    Unlock,
    Delete,
    Check,
}

impl PromptScriptKind {
    /// Pick the script for `action`; `strong_secret` selects the variant for
    /// actions that create a passphrase.
    pub fn for_action(action: Action, strong_secret: bool) -> Self {
        match (action, strong_secret) {
            (Action::Initialize, false) => Self::InitWeak,
            (Action::Initialize, true) => Self::InitStrong,
            (Action::Add, false) => Self::AddWeak,
            (Action::Add, true) => Self::AddStrong,
            (Action::Unlock, _) => Self::Unlock,
            (Action::Delete, _) => Self::Delete,
            (Action::Check, _) => Self::Check,
        }
    }

    /// Scripts that feed throwaway attempts until the tool locks out, so the
    /// failure code means the caller's secret was rejected.
    pub fn exhausts_retries(self) -> bool {
        matches!(self, Self::Unlock | Self::Delete | Self::Check)
    }
}

/// One expected prompt and the line typed in reply.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptStep {
    /// Literal text to wait for on the terminal
    pub expect: String,
    /// Line to type once `expect` was seen; `None` only consumes the prompt
    #[serde(default)]
    pub respond: Option<String>,
    /// Prompt that only appears on some paths (e.g. wrong-passphrase retries).
    /// A timeout here ends the scripted part if the tool already exited.
    #[serde(default)]
    pub optional: bool,
}

impl PromptStep {
    pub fn new(expect: impl Into<String>, respond: impl Into<String>) -> Self {
        Self {
            expect: expect.into(),
            respond: Some(respond.into()),
            optional: false,
        }
    }

    /// Step that waits for `expect` without typing anything.
    pub fn wait_for(expect: impl Into<String>) -> Self {
        Self {
            expect: expect.into(),
            respond: None,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl fmt::Debug for PromptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptStep")
            .field("expect", &self.expect)
            .field("respond", &self.respond.as_ref().map(|_| REDACTED))
            .field("optional", &self.optional)
            .finish()
    }
}

/// Terminal pattern signalling failure and the outcome code it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalFailure {
    pub pattern: String,
    pub exit_code: i32,
}

/// Rendered, immutable conversation for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptScript {
    pub kind: PromptScriptKind,
    pub steps: Vec<PromptStep>,
    pub success: Option<String>,
    pub failure: Option<TerminalFailure>,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub resource: &'a str,
    pub secret: &'a Secret,
    pub method_name: Option<&'a str>,
}

/// Unrendered conversation with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub steps: Vec<PromptStep>,
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub failure: Option<String>,
}

impl PromptTemplate {
    /// Substitute `ctx` into every pattern and response.
    ///
    /// A terminal pattern that references a value the context lacks is dropped; a
    /// step that does so is a configuration error.
    pub fn render(
        &self,
        kind: PromptScriptKind,
        ctx: &PromptContext<'_>,
        failure_exit_code: i32,
    ) -> Result<PromptScript> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let expect = fill(&step.expect, ctx).map_err(|key| missing(kind, key))?;
            let respond = match &step.respond {
                Some(r) => Some(fill(r, ctx).map_err(|key| missing(kind, key))?),
                None => None,
            };
            steps.push(PromptStep {
                expect,
                respond,
                optional: step.optional,
            });
        }

        let success = self.success.as_deref().and_then(|p| terminal(kind, p, ctx));
        let failure = self
            .failure
            .as_deref()
            .and_then(|p| terminal(kind, p, ctx))
            .map(|pattern| TerminalFailure {
                pattern,
                exit_code: failure_exit_code,
            });

        Ok(PromptScript {
            kind,
            steps,
            success,
            failure,
        })
    }
}

fn terminal(kind: PromptScriptKind, pattern: &str, ctx: &PromptContext<'_>) -> Option<String> {
    match fill(pattern, ctx) {
        Ok(p) => Some(p),
        Err(key) => {
            debug!("{} terminal pattern needs {{{}}}, dropping it", kind, key);
            None
        }
    }
}

fn missing(kind: PromptScriptKind, key: &str) -> AuthError {
    AuthError::config(format!("prompt template {} needs a value for {{{}}}", kind, key))
}

/// Single-pass placeholder substitution; substituted text is never re-scanned.
fn fill(template: &str, ctx: &PromptContext<'_>) -> std::result::Result<String, &'static str> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix("{resource}") {
            out.push_str(ctx.resource);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{secret}") {
            out.push_str(ctx.secret.expose());
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{name}") {
            out.push_str(ctx.method_name.ok_or("name")?);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    Ok(out)
}

// ============================================================================
// PromptCatalog
// ============================================================================

/// One template per script kind; missing rows in a config file keep the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptCatalog {
    pub init_weak: PromptTemplate,
    pub init_strong: PromptTemplate,
    pub add_weak: PromptTemplate,
    pub add_strong: PromptTemplate,
    pub unlock: PromptTemplate,
    pub delete: PromptTemplate,
    pub check: PromptTemplate,
}

impl PromptCatalog {
    pub fn template(&self, kind: PromptScriptKind) -> &PromptTemplate {
        match kind {
            PromptScriptKind::InitWeak => &self.init_weak,
            PromptScriptKind::InitStrong => &self.init_strong,
            PromptScriptKind::AddWeak => &self.add_weak,
            PromptScriptKind::AddStrong => &self.add_strong,
            PromptScriptKind::Unlock => &self.unlock,
            PromptScriptKind::Delete => &self.delete,
            PromptScriptKind::Check => &self.check,
        }
    }

    pub fn render(
        &self,
        kind: PromptScriptKind,
        ctx: &PromptContext<'_>,
        failure_exit_code: i32,
    ) -> Result<PromptScript> {
        self.template(kind).render(kind, ctx, failure_exit_code)
    }
}

const ENTER: &str = "Enter Passphrase: ";
const CONFIRM: &str = "Confirm Passphrase: ";
const UNSECURE: &str = "Please confirm usage of an unsecure passphrase (y|n): ";
const ADDED: &str = "Passphrase authentication method with name \"{name}\" added successfully.";

fn weak_creation() -> PromptTemplate {
    PromptTemplate {
        steps: vec![
            PromptStep::new("Enter Passphrase:", "{secret}"),
            PromptStep::new(UNSECURE, "y"),
            PromptStep::new("Confirm Passphrase:", "{secret}"),
        ],
        success: Some(ADDED.to_string()),
        failure: None,
    }
}

fn strong_creation() -> PromptTemplate {
    PromptTemplate {
        steps: vec![
            PromptStep::new(ENTER, "{secret}"),
            PromptStep::new(CONFIRM, "{secret}"),
        ],
        success: Some(ADDED.to_string()),
        failure: None,
    }
}

/// First attempt with the real secret, then two throwaway attempts so a wrong
/// secret always runs into the tool's 3-attempt lockout.
fn exhausting_retry(failure: &str) -> PromptTemplate {
    PromptTemplate {
        steps: vec![
            PromptStep::new(ENTER, "{secret}"),
            PromptStep::wait_for("Wrong passphrase. Try again (2/3)").optional(),
            PromptStep::new(ENTER, EXHAUST_RESPONSE).optional(),
            PromptStep::wait_for("Wrong passphrase. Try again (3/3)").optional(),
            PromptStep::new(ENTER, EXHAUST_RESPONSE).optional(),
        ],
        success: None,
        failure: Some(failure.to_string()),
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self {
            init_weak: weak_creation(),
            init_strong: strong_creation(),
            add_weak: weak_creation(),
            add_strong: strong_creation(),
            unlock: exhausting_retry("hdcryptmgr authunlock failed for device {resource}."),
            delete: exhausting_retry("3020-0386 Unable to check selected authentication method."),
            check: PromptTemplate {
                steps: vec![
                    PromptStep::new("Enter Passphrase:", "{secret}"),
                    PromptStep::new("Enter Passphrase:", "Wrong").optional(),
                    PromptStep::new("Enter Passphrase:", "Wrong").optional(),
                ],
                success: None,
                failure: Some("3020-0464 hdcryptmgr authcheck failed for device".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn ctx<'a>(secret: &'a Secret, name: Option<&'a str>) -> PromptContext<'a> {
        PromptContext {
            resource: "testlv",
            secret,
            method_name: name,
        }
    }

    #[test]
    fn test_only_retry_scripts_exhaust() {
        let exhausting: Vec<_> = PromptScriptKind::iter().filter(|k| k.exhausts_retries()).collect();
        assert_eq!(
            exhausting,
            vec![PromptScriptKind::Unlock, PromptScriptKind::Delete, PromptScriptKind::Check]
        );
    }

    #[test]
    fn test_kind_selection() {
        assert_eq!(PromptScriptKind::for_action(Action::Initialize, false), PromptScriptKind::InitWeak);
        assert_eq!(PromptScriptKind::for_action(Action::Add, true), PromptScriptKind::AddStrong);
        assert_eq!(PromptScriptKind::for_action(Action::Unlock, true), PromptScriptKind::Unlock);
        assert_eq!(PromptScriptKind::for_action(Action::Check, false), PromptScriptKind::Check);
    }

    #[test]
    fn test_weak_init_expects_confirmation_first() {
        let secret = Secret::new("testpass");
        let script = PromptCatalog::default()
            .render(PromptScriptKind::InitWeak, &ctx(&secret, Some(DEFAULT_INIT_METHOD_NAME)), 5)
            .expect("render");

        let expects: Vec<&str> = script.steps.iter().map(|s| s.expect.as_str()).collect();
        assert_eq!(expects, vec!["Enter Passphrase:", UNSECURE, "Confirm Passphrase:"]);
        assert_eq!(script.steps[0].respond.as_deref(), Some("testpass"));
        assert_eq!(script.steps[1].respond.as_deref(), Some("y"));
        assert_eq!(
            script.success.as_deref(),
            Some("Passphrase authentication method with name \"initpwd\" added successfully.")
        );
        assert!(script.failure.is_none());
    }

    #[test]
    fn test_unlock_failure_pattern_names_resource() {
        let secret = Secret::new("testpass");
        let script = PromptCatalog::default()
            .render(PromptScriptKind::Unlock, &ctx(&secret, None), 5)
            .expect("render");

        assert_eq!(
            script.failure,
            Some(TerminalFailure {
                pattern: "hdcryptmgr authunlock failed for device testlv.".to_string(),
                exit_code: 5,
            })
        );
        assert!(!script.steps[0].optional);
        assert!(script.steps[1..].iter().all(|s| s.optional));
        let retries = script
            .steps
            .iter()
            .filter(|s| s.respond.as_deref() == Some(EXHAUST_RESPONSE))
            .count();
        assert_eq!(retries, 2);
    }

    #[test]
    fn test_add_without_name_drops_success_pattern() {
        let secret = Secret::new("testpass");
        let script = PromptCatalog::default()
            .render(PromptScriptKind::AddStrong, &ctx(&secret, None), 5)
            .expect("render");
        assert!(script.success.is_none());
        assert_eq!(script.steps.len(), 2);
    }

    #[test]
    fn test_step_needing_missing_value_is_config_error() {
        let template = PromptTemplate {
            steps: vec![PromptStep::new("Name for {name}:", "{secret}")],
            success: None,
            failure: None,
        };
        let secret = Secret::new("x");
        let err = template
            .render(PromptScriptKind::AddWeak, &ctx(&secret, None), 5)
            .expect_err("should fail");
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let secret = Secret::new("{resource}");
        let filled = fill("{secret} on {resource} {unknown}", &ctx(&secret, None)).expect("fill");
        assert_eq!(filled, "{resource} on testlv {unknown}");
    }

    #[test]
    fn test_debug_redacts_responses() {
        let secret = Secret::new("hunter2hunter2");
        let script = PromptCatalog::default()
            .render(PromptScriptKind::Delete, &ctx(&secret, None), 5)
            .expect("render");
        let printed = format!("{:?}", script);
        assert!(!printed.contains("hunter2hunter2"));
        assert!(printed.contains("Enter Passphrase"));
    }

    #[test]
    fn test_partial_catalog_keeps_defaults() {
        let json = r#"{ "check": { "steps": [ { "expect": "Passphrase?", "respond": "{secret}" } ] } }"#;
        let catalog: PromptCatalog = serde_json::from_str(json).expect("parse");
        assert_eq!(catalog.check.steps.len(), 1);
        assert!(catalog.check.failure.is_none());
        assert_eq!(catalog.unlock, PromptCatalog::default().unlock);
    }

    #[test]
    fn test_every_default_template_renders() {
        let secret = Secret::new("testpass");
        let catalog = PromptCatalog::default();
        for kind in PromptScriptKind::iter() {
            let script = catalog
                .render(kind, &ctx(&secret, Some("pwd2")), 5)
                .expect("default templates render");
            assert!(!script.steps.is_empty());
            assert_eq!(script.steps[0].respond.as_deref(), Some("testpass"));
        }
    }
}
