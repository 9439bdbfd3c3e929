//! Tool configuration file handling.
//!
//! The configuration pins the external contract of the managed tool: binary
//! locations, the exit code reserved for a rejected secret, the per-prompt timeout
//! and the prompt catalog. All fields have defaults matching `hdcryptmgr` on
//! AIX 7.2, so a config file only needs the rows that differ.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::prompt::PromptCatalog;

/// Default location of the authentication manager.
pub const DEFAULT_TOOL_PATH: &str = "/usr/sbin/hdcryptmgr";
/// Default location of the logical-volume listing command.
pub const DEFAULT_LSLV_PATH: &str = "/usr/sbin/lslv";
/// Outcome code reported when a session ends at the wrong-secret pattern.
pub const DEFAULT_WRONG_SECRET_EXIT_CODE: i32 = 5;
/// Seconds to wait for each scripted prompt.
pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Absolute path of `hdcryptmgr`
    pub tool_path: PathBuf,
    /// Absolute path of `lslv`, used for the resource existence check
    pub lslv_path: PathBuf,
    /// Run `lslv <resource>` before anything else
    pub verify_resource: bool,
    /// Exit code classified as a wrong secret
    pub wrong_secret_exit_code: i32,
    /// Bound on each scripted prompt wait (the final wait is unbounded)
    pub prompt_timeout_secs: u64,
    /// Prompt/response tables per script kind
    pub prompts: PromptCatalog,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from(DEFAULT_TOOL_PATH),
            lslv_path: PathBuf::from(DEFAULT_LSLV_PATH),
            verify_resource: true,
            wrong_secret_exit_code: DEFAULT_WRONG_SECRET_EXIT_CODE,
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
            prompts: PromptCatalog::default(),
        }
    }
}

impl ToolConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| {
            AuthError::config(format!(
                "Failed to read configuration from {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.tool_path.is_absolute() {
            return Err(AuthError::config(format!(
                "tool_path must be absolute, got {:?}",
                self.tool_path
            )));
        }
        if self.verify_resource && !self.lslv_path.is_absolute() {
            return Err(AuthError::config(format!(
                "lslv_path must be absolute, got {:?}",
                self.lslv_path
            )));
        }
        if self.wrong_secret_exit_code <= 0 || self.wrong_secret_exit_code > 255 {
            return Err(AuthError::config(format!(
                "wrong_secret_exit_code must be in 1..=255, got {}",
                self.wrong_secret_exit_code
            )));
        }
        if self.prompt_timeout_secs == 0 {
            return Err(AuthError::config("prompt_timeout_secs must be positive"));
        }

        Ok(())
    }
}
