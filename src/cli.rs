use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::builder::CommandIntent;
use crate::types::{Action, IntentFlag, MethodType};

/// cryptauth - manage authentication methods of encrypted logical volumes
#[derive(Parser, Debug)]
#[command(name = "cryptauth")]
#[command(about = "Initialize, add, delete, unlock and check hdcryptmgr authentication methods")]
#[command(version)]
pub struct Cli {
    /// Tool configuration file (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply one authentication-method action and print the result as JSON
    Run(ActionArgs),
    /// Print the parsed authentication state of a device as JSON
    Status {
        /// Logical volume to query
        #[arg(short, long)]
        device: String,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        path: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ActionArgs {
    /// initialize, add, delete, unlock or check
    #[arg(short, long)]
    pub action: Action,

    /// Logical volume to operate on
    #[arg(short, long)]
    pub device: String,

    /// Authentication method type (pwd, keyfile, pks)
    #[arg(short = 't', long)]
    pub auth_type: Option<MethodType>,

    /// Name of the authentication method
    #[arg(short = 'n', long)]
    pub auth_name: Option<String>,

    /// Method detail, e.g. the key file location
    #[arg(short = 'm', long)]
    pub auth_detail: Option<String>,

    /// Slot index of the authentication method
    #[arg(short = 'i', long)]
    pub auth_index: Option<u32>,

    /// Passphrase to type at the tool's prompts
    #[arg(long, env = "CRYPTAUTH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Force deletion
    #[arg(short, long)]
    pub force: bool,

    /// Unlock using automatic key protection
    #[arg(long)]
    pub auto_key_protection: bool,
}

impl ActionArgs {
    /// Translate flags into an intent for the orchestrator.
    pub fn into_intent(self) -> CommandIntent {
        let mut intent = CommandIntent::new(self.action, self.device);
        intent.method_type = self.auth_type;
        intent.method_name = self.auth_name;
        intent.method_detail = self.auth_detail;
        intent.method_index = self.auth_index.map(|i| i.to_string());
        intent.secret = self.password.map(Into::into);
        if self.force {
            intent.flags.insert(IntentFlag::Force);
        }
        if self.auto_key_protection {
            intent.flags.insert(IntentFlag::AutoProtection);
        }
        intent
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
