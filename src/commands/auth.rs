//! Type-safe arguments for the `hdcryptmgr auth*` subcommands.
//!
//! - `AuthInitArgs` for `hdcryptmgr authinit`
//! - `AuthAddArgs` for `hdcryptmgr authadd`
//! - `AuthDeleteArgs` for `hdcryptmgr authdelete`
//! - `AuthUnlockArgs` for `hdcryptmgr authunlock`
//! - `AuthCheckArgs` for `hdcryptmgr authcheck`
//!
//! Flags are emitted in the order the AIX documentation lists them, followed by
//! the logical volume. Passphrases are never arguments: the tool prompts for them
//! on its terminal (see `session`).

use crate::tool_traits::{push_opt, ToolArgs};
use crate::types::{Action, MethodType};

fn push_type(args: &mut Vec<String>, method_type: Option<MethodType>) {
    if let Some(t) = method_type {
        args.push("-t".to_string());
        args.push(t.to_string());
    }
}

// ============================================================================
// AuthInitArgs
// ============================================================================

/// Arguments for `authinit`, which creates the primary key and its first
/// passphrase method.
///
/// | Rust Field | CLI Flag |
/// |------------|----------|
/// | `detail`   | `-e`     |
/// | `name`     | `-n`     |
/// | `resource` | positional |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInitArgs {
    pub resource: String,
    pub detail: Option<String>,
    pub name: Option<String>,
}

impl ToolArgs for AuthInitArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_opt(&mut args, "-e", self.detail.as_deref());
        push_opt(&mut args, "-n", self.name.as_deref());
        args.push(self.resource.clone());
        args
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some(Action::Initialize.subcommand())
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

// ============================================================================
// AuthAddArgs
// ============================================================================

/// Arguments for `authadd`.
///
/// | Rust Field    | CLI Flag |
/// |---------------|----------|
/// | `method_type` | `-t`     |
/// | `detail`      | `-m` (key file path for `keyfile`) |
/// | `name`        | `-n`     |
/// | `resource`    | positional |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthAddArgs {
    pub resource: String,
    pub method_type: MethodType,
    pub detail: Option<String>,
    pub name: Option<String>,
}

impl ToolArgs for AuthAddArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_type(&mut args, Some(self.method_type));
        push_opt(&mut args, "-m", self.detail.as_deref());
        push_opt(&mut args, "-n", self.name.as_deref());
        args.push(self.resource.clone());
        args
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some(Action::Add.subcommand())
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

// ============================================================================
// AuthDeleteArgs
// ============================================================================

/// Arguments for `authdelete`.
///
/// | Rust Field    | CLI Flag |
/// |---------------|----------|
/// | `method_type` | `-t`     |
/// | `detail`      | `-m`     |
/// | `index`       | `-i`     |
/// | `name`        | `-n`     |
/// | `force`       | `-f`     |
/// | `resource`    | positional |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDeleteArgs {
    pub resource: String,
    pub method_type: MethodType,
    pub detail: Option<String>,
    pub index: Option<String>,
    pub name: Option<String>,
    pub force: bool,
}

impl ToolArgs for AuthDeleteArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_type(&mut args, Some(self.method_type));
        push_opt(&mut args, "-m", self.detail.as_deref());
        push_opt(&mut args, "-i", self.index.as_deref());
        push_opt(&mut args, "-n", self.name.as_deref());
        if self.force {
            args.push("-f".to_string());
        }
        args.push(self.resource.clone());
        args
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some(Action::Delete.subcommand())
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

// ============================================================================
// AuthUnlockArgs
// ============================================================================

/// Arguments for `authunlock`.
///
/// `auto_protection` (`-A`) authenticates with the methods that need no user
/// input and excludes `-t`/`-m`; the builder enforces that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUnlockArgs {
    pub resource: String,
    pub method_type: Option<MethodType>,
    pub detail: Option<String>,
    pub auto_protection: bool,
}

impl ToolArgs for AuthUnlockArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_type(&mut args, self.method_type);
        push_opt(&mut args, "-m", self.detail.as_deref());
        if self.auto_protection {
            args.push("-A".to_string());
        }
        args.push(self.resource.clone());
        args
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some(Action::Unlock.subcommand())
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

// ============================================================================
// AuthCheckArgs
// ============================================================================

/// Arguments for `authcheck`, a read-only validity test of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCheckArgs {
    pub resource: String,
    pub method_type: MethodType,
    pub detail: Option<String>,
    pub index: Option<String>,
    pub name: Option<String>,
}

impl ToolArgs for AuthCheckArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_type(&mut args, Some(self.method_type));
        push_opt(&mut args, "-m", self.detail.as_deref());
        push_opt(&mut args, "-i", self.index.as_deref());
        push_opt(&mut args, "-n", self.name.as_deref());
        args.push(self.resource.clone());
        args
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some(Action::Check.subcommand())
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const TOOL: &str = "/usr/sbin/hdcryptmgr";

    #[test]
    fn test_resource_is_last_for_every_subcommand() {
        let resource = "testlv".to_string();
        let detail = Some("/keys/key1".to_string());
        let name = Some("pwd2".to_string());
        let index = Some("1".to_string());

        let all: Vec<Vec<String>> = vec![
            AuthInitArgs {
                resource: resource.clone(),
                detail: detail.clone(),
                name: name.clone(),
            }
            .to_cli_args(),
            AuthAddArgs {
                resource: resource.clone(),
                method_type: MethodType::Keyfile,
                detail: detail.clone(),
                name: name.clone(),
            }
            .to_cli_args(),
            AuthDeleteArgs {
                resource: resource.clone(),
                method_type: MethodType::Keyfile,
                detail: detail.clone(),
                index: index.clone(),
                name: name.clone(),
                force: true,
            }
            .to_cli_args(),
            AuthUnlockArgs {
                resource: resource.clone(),
                method_type: None,
                detail: None,
                auto_protection: true,
            }
            .to_cli_args(),
            AuthCheckArgs {
                resource: resource.clone(),
                method_type: MethodType::Keyfile,
                detail,
                index,
                name,
            }
            .to_cli_args(),
        ];

        for args in all {
            assert_eq!(args.last(), Some(&resource), "{:?}", args);
        }
    }

    #[test]
    fn test_init_args() {
        let args = AuthInitArgs {
            resource: "testlv".to_string(),
            detail: None,
            name: Some("initpwd".to_string()),
        };
        assert_eq!(
            args.argv(Path::new(TOOL)),
            vec![TOOL, "authinit", "-n", "initpwd", "testlv"]
        );
        assert!(args.is_mutating());
    }

    #[test]
    fn test_add_keyfile_args() {
        let args = AuthAddArgs {
            resource: "testlv".to_string(),
            method_type: MethodType::Keyfile,
            detail: Some("/key2".to_string()),
            name: Some("file_2".to_string()),
        };
        assert_eq!(
            args.to_cli_args(),
            vec!["-t", "keyfile", "-m", "/key2", "-n", "file_2", "testlv"]
        );
    }

    #[test]
    fn test_delete_args_flag_order() {
        let args = AuthDeleteArgs {
            resource: "testlv".to_string(),
            method_type: MethodType::Passphrase,
            detail: None,
            index: Some("3".to_string()),
            name: Some("pwd5".to_string()),
            force: true,
        };
        assert_eq!(
            args.to_cli_args(),
            vec!["-t", "pwd", "-i", "3", "-n", "pwd5", "-f", "testlv"]
        );
    }

    #[test]
    fn test_unlock_auto_protection() {
        let args = AuthUnlockArgs {
            resource: "testlv".to_string(),
            method_type: None,
            detail: None,
            auto_protection: true,
        };
        assert_eq!(
            args.argv(Path::new(TOOL)),
            vec![TOOL, "authunlock", "-A", "testlv"]
        );
    }

    #[test]
    fn test_check_is_not_mutating() {
        let args = AuthCheckArgs {
            resource: "testlv".to_string(),
            method_type: MethodType::Pks,
            detail: None,
            index: None,
            name: Some("test_pks".to_string()),
        };
        assert_eq!(args.to_cli_args(), vec!["-t", "pks", "-n", "test_pks", "testlv"]);
        assert!(!args.is_mutating());
    }
}
