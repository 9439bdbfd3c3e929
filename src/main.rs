//! cryptauth - Main entry point
//!
//! Prints exactly one JSON record on stdout; logs go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use cryptauth::cli::{Cli, Commands};
use cryptauth::config::ToolConfig;
use cryptauth::orchestrator::Orchestrator;
use cryptauth::process_guard::{self, ProcessGuard};
use cryptauth::runner::SystemRunner;

/// Initialize tracing with RUST_LOG taking precedence over `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<ToolConfig> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ToolConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => ToolConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    debug!("CLI arguments parsed");

    // Keep going without handlers; the guard still cleans up on normal exit
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let _guard = ProcessGuard::new();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run(args) => {
            let intent = args.into_intent();
            let orchestrator = Orchestrator::new(SystemRunner::from_config(&config), config);

            match orchestrator.execute(&intent) {
                Ok(report) => print_json(&report)?,
                Err(e) => {
                    error!("Action {} on {} failed: {}", intent.action, intent.resource, e);
                    print_json(&e.to_report())?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { device } => {
            let orchestrator = Orchestrator::new(SystemRunner::from_config(&config), config);
            match orchestrator.query_state(&device) {
                Ok(state) => print_json(&state)?,
                Err(e) => {
                    error!("Status query for {} failed: {}", device, e);
                    print_json(&e.to_report())?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { path } => {
            ToolConfig::load_from_file(&path)?.validate()?;
            info!("Configuration {:?} is valid", path);
        }
        Commands::InitConfig { output } => {
            ToolConfig::default().save_to_file(&output)?;
            info!("Default configuration written to {:?}", output);
        }
    }

    Ok(())
}
