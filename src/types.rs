//! Type-safe request vocabulary for cryptauth
//!
//! Actions, method types and intent flags are proper Rust enums so the builder and
//! orchestrator can match exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Operation requested against one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create the primary key and its first (passphrase) protection method
    Initialize,
    /// Add another protection method to an initialized resource
    Add,
    /// Remove a protection method by name and/or index
    Delete,
    /// Authenticate to unlock the resource
    Unlock,
    /// Verify that a protection method is valid
    Check,
}

impl Action {
    /// Tool subcommand implementing this action.
    pub fn subcommand(self) -> &'static str {
        match self {
            Self::Initialize => "authinit",
            Self::Add => "authadd",
            Self::Delete => "authdelete",
            Self::Unlock => "authunlock",
            Self::Check => "authcheck",
        }
    }

    /// Whether the action addresses an existing method by name or index.
    pub fn targets_existing_method(self) -> bool {
        matches!(self, Self::Delete | Self::Check)
    }
}

/// Kind of key-protection method.
///
/// `to_string` yields the spelling the tool accepts after `-t`; parsing also accepts
/// the spelling used in status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum MethodType {
    #[strum(to_string = "pwd", serialize = "passphrase")]
    #[serde(rename = "pwd", alias = "passphrase")]
    Passphrase,
    #[strum(to_string = "keyfile")]
    #[serde(rename = "keyfile")]
    Keyfile,
    /// Platform keystore, the token-based method
    #[strum(to_string = "pks")]
    #[serde(rename = "pks")]
    Pks,
}

impl MethodType {
    /// Passphrase methods are the only ones that prompt for a secret.
    pub fn prompts_for_secret(self) -> bool {
        matches!(self, Self::Passphrase)
    }
}

/// Boolean switches that map to bare tool flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum IntentFlag {
    /// `-f`: force the action
    Force,
    /// `-A`: use automatic key-protection methods that need no user input
    AutoProtection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_method_type_parses_status_and_cli_spellings() {
        assert_eq!("pwd".parse::<MethodType>().ok(), Some(MethodType::Passphrase));
        assert_eq!("Passphrase".parse::<MethodType>().ok(), Some(MethodType::Passphrase));
        assert_eq!("PKS".parse::<MethodType>().ok(), Some(MethodType::Pks));
        assert_eq!("Keyfile".parse::<MethodType>().ok(), Some(MethodType::Keyfile));
        assert!("token".parse::<MethodType>().is_err());
    }

    #[test]
    fn test_method_type_display_is_cli_spelling() {
        let rendered: Vec<String> = MethodType::iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["pwd", "keyfile", "pks"]);
    }

    #[test]
    fn test_action_roundtrip() {
        for action in Action::iter() {
            let parsed: Action = action.to_string().parse().expect("Should parse");
            assert_eq!(action, parsed);
        }
        assert_eq!("UNLOCK".parse::<Action>().ok(), Some(Action::Unlock));
    }

    #[test]
    fn test_action_subcommands() {
        assert_eq!(Action::Initialize.subcommand(), "authinit");
        assert_eq!(Action::Delete.subcommand(), "authdelete");
    }

    #[test]
    fn test_method_type_serde_names() {
        let json = serde_json::to_string(&MethodType::Passphrase).expect("serialize");
        assert_eq!(json, "\"pwd\"");
        let parsed: MethodType = serde_json::from_str("\"passphrase\"").expect("deserialize");
        assert_eq!(parsed, MethodType::Passphrase);
    }
}
