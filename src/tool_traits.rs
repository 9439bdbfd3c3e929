//! Type-safe tool argument contracts.
//!
//! Instead of assembling raw strings, every invocation of an external tool is
//! described by a struct implementing [`ToolArgs`]. The struct definition is the
//! contract: its fields map to exactly one flag each, in a fixed order, so the
//! same struct always yields byte-identical argv.
//!
//! # Invariants
//!
//! - The returned CLI args MUST match the tool's documented syntax.
//! - Secrets MUST NOT appear in any returned argument.
//! - `auth*` subcommands take the resource as the last argument, which the
//!   session driver relies on. `showlv` takes it before `-v`.
//! - The program path is resolved by the caller from configuration.

use std::path::Path;

/// Trait for typed tool arguments.
pub trait ToolArgs {
    /// Convert struct fields to CLI arguments in the tool's documented order.
    fn to_cli_args(&self) -> Vec<String>;

    /// Subcommand placed right after the program, if the tool uses one.
    fn subcommand(&self) -> Option<&'static str>;

    /// Whether running these args can change the resource.
    fn is_mutating(&self) -> bool;

    /// Full argument vector, program included.
    fn argv(&self, program: &Path) -> Vec<String> {
        let mut argv = vec![program.display().to_string()];
        if let Some(sub) = self.subcommand() {
            argv.push(sub.to_string());
        }
        argv.extend(self.to_cli_args());
        argv
    }
}

/// Render an argv the way an operator would type it.
pub fn command_line(argv: &[String]) -> String {
    argv.join(" ")
}

/// Push `flag value` when `value` is present.
pub(crate) fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnlockAll;

    impl ToolArgs for UnlockAll {
        fn to_cli_args(&self) -> Vec<String> {
            vec!["-A".to_string(), "testlv".to_string()]
        }

        fn subcommand(&self) -> Option<&'static str> {
            Some("authunlock")
        }

        fn is_mutating(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_argv_includes_program_and_subcommand() {
        let argv = UnlockAll.argv(Path::new("/usr/sbin/hdcryptmgr"));
        assert_eq!(argv, vec!["/usr/sbin/hdcryptmgr", "authunlock", "-A", "testlv"]);
        assert_eq!(command_line(&argv), "/usr/sbin/hdcryptmgr authunlock -A testlv");
    }

    #[test]
    fn test_push_opt() {
        let mut args = Vec::new();
        push_opt(&mut args, "-n", None);
        assert!(args.is_empty());
        push_opt(&mut args, "-n", Some("pwd2"));
        assert_eq!(args, vec!["-n", "pwd2"]);
    }
}
