//! Read-only queries used before any mutating action.

use crate::tool_traits::ToolArgs;

/// `hdcryptmgr showlv <lv> -v`: verbose status listing consumed by `facts::parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowStatusArgs {
    pub resource: String,
}

impl ToolArgs for ShowStatusArgs {
    fn to_cli_args(&self) -> Vec<String> {
        vec![self.resource.clone(), "-v".to_string()]
    }

    fn subcommand(&self) -> Option<&'static str> {
        Some("showlv")
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `lslv <lv>`: exits non-zero when the logical volume does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceExistsArgs {
    pub resource: String,
}

impl ToolArgs for ResourceExistsArgs {
    fn to_cli_args(&self) -> Vec<String> {
        vec![self.resource.clone()]
    }

    fn subcommand(&self) -> Option<&'static str> {
        None
    }

    fn is_mutating(&self) -> bool {
        false
    }
}
