//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the caller)
//! with defaults for everything, so the binary runs with no setup next to
//! `deliveries.csv` and `fleet.csv`. Command-line flags override these.
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_usize {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read a string environment variable, falling back to a default.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub deliveries_path: PathBuf,
    pub fleet_path: PathBuf,
    /// Directory that receives exported reports.
    pub report_dir: PathBuf,
    /// Prefix for money values in the KPI cards.
    pub currency_symbol: String,
    /// Rows shown per table in console output.
    pub preview_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            deliveries_path: PathBuf::from("deliveries.csv"),
            fleet_path: PathBuf::from("fleet.csv"),
            report_dir: PathBuf::from("."),
            currency_symbol: "₦".to_string(),
            preview_rows: 10,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// - `DELIVERIES_CSV` – delivery events table (default: `deliveries.csv`)
/// - `FLEET_CSV` – vehicle registry table (default: `fleet.csv`)
/// - `REPORT_DIR` – export directory (default: `.`)
/// - `CURRENCY_SYMBOL` – money prefix (default: `₦`)
/// - `PREVIEW_ROWS` – console table length (default: 10)
///
/// Returns an error only when `PREVIEW_ROWS` is not a number.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();
    let preview_rows = parse_env_usize!("PREVIEW_ROWS", defaults.preview_rows);
    Ok(Config {
        deliveries_path: PathBuf::from(env_or!("DELIVERIES_CSV", "deliveries.csv")),
        fleet_path: PathBuf::from(env_or!("FLEET_CSV", "fleet.csv")),
        report_dir: PathBuf::from(env_or!("REPORT_DIR", ".")),
        currency_symbol: env_or!("CURRENCY_SYMBOL", defaults.currency_symbol),
        preview_rows,
    })
}

impl Config {
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  DELIVERIES_CSV  : {}", self.deliveries_path.display());
        tracing::info!("  FLEET_CSV       : {}", self.fleet_path.display());
        tracing::info!("  REPORT_DIR      : {}", self.report_dir.display());
        tracing::info!("  CURRENCY_SYMBOL : {}", self.currency_symbol);
        tracing::info!("  PREVIEW_ROWS    : {}", self.preview_rows);
    }
}
