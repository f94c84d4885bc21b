mod address;
mod aggregator;
mod amount;
mod cache;
mod cli_messages;
mod config;
mod consts;
mod dashboard;
mod divergence;
mod environment;
mod error_classifier;
mod events;
mod logging;
mod pool;
mod session;
mod sources;
#[cfg(test)]
mod test_support;
mod workers;

use crate::address::parse_account_address;
use crate::config::{Config, get_config_path};
use crate::environment::Environment;
use crate::session::{run_headless_mode, run_snapshot_mode, setup_session};
use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Command-line arguments
struct Args {
    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with an account address and remember it.
    Login {
        /// Account address. 42-character hex string starting with '0x'
        #[arg(long, value_name = "ADDRESS")]
        address: String,
    },
    /// Forget the signed-in account and clear the configuration.
    Logout,
    /// Print the dashboard once every stat has settled.
    Snapshot {
        /// Account to show. Defaults to the signed-in account.
        #[arg(long, value_name = "ADDRESS")]
        address: Option<String>,
    },
    /// Watch the dashboard and print changes until Ctrl+C.
    Watch {
        /// Account to show. Defaults to the signed-in account.
        #[arg(long, value_name = "ADDRESS")]
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init_logger();

    let config_path = get_config_path()?;
    let args = Args::parse();
    match args.command {
        Command::Login { address } => login(&config_path, &address),
        Command::Logout => {
            report!(Info, "Logging out", "Clearing {}", config_path.display());
            Config::clear(&config_path).map_err(Into::into)
        }
        Command::Snapshot { address } => {
            let config = Config::load_or_default(&config_path)?;
            let address = resolve_address(&config, address.as_deref())?;
            let environment = resolve_environment(&config, environment_override().as_deref());
            run_snapshot_mode(&config, address, environment).await
        }
        Command::Watch { address } => {
            let config = Config::load_or_default(&config_path)?;
            let address = resolve_address(&config, address.as_deref())?;
            let environment = resolve_environment(&config, environment_override().as_deref());
            let session = setup_session(&config, address, environment).await?;
            run_headless_mode(session).await
        }
    }
}

/// Validates `address` and stores it as the signed-in account.
fn login(config_path: &Path, address: &str) -> Result<(), Box<dyn Error>> {
    let parsed = match parse_account_address(address) {
        Ok(parsed) => parsed,
        Err(e) => {
            report!(Error, "Login failed", "{}", e);
            return Err(e.into());
        }
    };

    let mut config = match Config::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            report!(Warn, "Replacing unreadable config", "{}", e);
            Config::default()
        }
    };
    config.address = Some(parsed.to_checksum(None));
    config
        .save(config_path)
        .map_err(|e| format!("Failed to save config: {}", e))?;
    report!(Success, "Signed in", "{}", parsed);
    Ok(())
}

/// `--address` wins over the signed-in account.
fn resolve_address(config: &Config, address: Option<&str>) -> Result<Address, Box<dyn Error>> {
    match address.or(config.address.as_deref()) {
        Some(address) => parse_account_address(address).map_err(Into::into),
        None => Err(Box::from(
            "No account signed in. Run `pool-portal login --address <ADDRESS>` or pass --address.",
        )),
    }
}

fn environment_override() -> Option<String> {
    std::env::var("POOL_PORTAL_ENVIRONMENT").ok()
}

/// A recognized override wins over the configured environment.
fn resolve_environment(config: &Config, override_value: Option<&str>) -> Environment {
    override_value
        .and_then(|value| value.parse::<Environment>().ok())
        .or(config.environment)
        .unwrap_or_default()
}
