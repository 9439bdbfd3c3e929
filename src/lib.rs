//! cryptauth Library
//!
//! Authentication-method management for `hdcryptmgr`-encrypted logical volumes:
//! status parsing, validated command building, scripted pseudo-terminal sessions
//! for passphrase prompts, and the per-action workflows tying them together.

pub mod builder;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod facts;
pub mod orchestrator;
pub mod process_guard;
pub mod prompt;
pub mod runner;
pub mod secret;
pub mod session;
pub mod tool_traits;
pub mod types;

// Re-export main types for convenience
pub use builder::{BuiltCommand, CommandBuilder, CommandIntent};
pub use config::ToolConfig;
pub use error::{AuthError, FailureReport, Result};
pub use facts::{parse, FactError, MethodEntry, ResourceAuthState};
pub use orchestrator::{ActionReport, Orchestrator};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use prompt::{PromptCatalog, PromptScript, PromptScriptKind, PromptStep, PromptTemplate};
pub use runner::{SystemRunner, ToolOutput, ToolRunner};
pub use secret::{is_strong_secret, Secret};
pub use session::{ExecutionOutcome, SessionDriver};
pub use tool_traits::ToolArgs;
pub use types::{Action, IntentFlag, MethodType};
