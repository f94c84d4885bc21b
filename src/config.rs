//! Application configuration.

use crate::consts::portal_consts::{DIVERGENCE_THRESHOLD_UNITS, refresh};
use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{fs, path::Path};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Signed-in account address, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Overrides the environment's gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,

    #[serde(default = "default_divergence_threshold_units")]
    pub divergence_threshold_units: u64,

    #[serde(default = "default_account_refresh_ms")]
    pub account_refresh_ms: u64,

    #[serde(default = "default_rgt_price_refresh_ms")]
    pub rgt_price_refresh_ms: u64,

    #[serde(default = "default_tvl_refresh_ms")]
    pub tvl_refresh_ms: u64,

    #[serde(default = "default_apy_refresh_ms")]
    pub apy_refresh_ms: u64,
}

fn default_divergence_threshold_units() -> u64 {
    DIVERGENCE_THRESHOLD_UNITS
}

fn default_account_refresh_ms() -> u64 {
    refresh::ACCOUNT_REFRESH_MS
}

fn default_rgt_price_refresh_ms() -> u64 {
    refresh::RGT_PRICE_REFRESH_MS
}

fn default_tvl_refresh_ms() -> u64 {
    refresh::TVL_REFRESH_MS
}

fn default_apy_refresh_ms() -> u64 {
    refresh::APY_REFRESH_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: None,
            environment: None,
            gateway_url: None,
            divergence_threshold_units: default_divergence_threshold_units(),
            account_refresh_ms: default_account_refresh_ms(),
            rgt_price_refresh_ms: default_rgt_price_refresh_ms(),
            tvl_refresh_ms: default_tvl_refresh_ms(),
            apy_refresh_ms: default_apy_refresh_ms(),
        }
    }
}

impl Config {
    /// Create Config signed in as `address`.
    pub fn new(address: String) -> Self {
        Config {
            address: Some(address),
            ..Config::default()
        }
    }

    /// Loads configuration from a JSON file at the given path.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if reading from file fails or JSON is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let buf = fs::read(path)?;
        let config: Config = serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Loads the configuration at `path`, or the defaults if there is none yet.
    pub fn load_or_default(path: &Path) -> Result<Self, std::io::Error> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a JSON file at the given path.
    ///
    /// Directories will be created if they don't exist. This method overwrites existing files.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if writing to file fails or serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Deletes the configuration file at `path`. A missing file is not an error.
    pub fn clear(path: &Path) -> Result<(), std::io::Error> {
        match fs::remove_file(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// `$HOME/.pool-portal/config.json`
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let home_path = home::home_dir().ok_or(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Failed to get home directory",
    ))?;
    Ok(home_path.join(".pool-portal").join("config.json"))
}
