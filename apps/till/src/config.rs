//! # Till Configuration
//!
//! Settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`APOTHECARY_*`)
//! 3. Defaults (this file)
//!
//! Read-only after startup.

use std::path::PathBuf;

use apothecary_core::Money;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Till configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TillConfig {
    /// Store name (printed on invoices)
    pub store_name: String,

    /// Store address lines (printed on invoices)
    pub store_address: Vec<String>,

    /// Currency symbol for display
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Sale headers without items younger than this are left alone by the sweep.
    pub orphan_grace_minutes: i64,

    /// Sales loaded for the history view.
    pub history_limit: u32,
}

impl Default for TillConfig {
    /// ## Default Values
    /// - Store: "Apothecary Pharmacy"
    /// - Currency: ₹ with 2 decimals
    /// - Database: platform data directory
    /// - Orphan grace: 10 minutes
    fn default() -> Self {
        TillConfig {
            store_name: "Apothecary Pharmacy".to_string(),
            store_address: vec!["12 Station Road".to_string(), "Pune 411001".to_string()],
            currency_symbol: "₹".to_string(),
            currency_decimals: 2,
            database_path: None,
            orphan_grace_minutes: 10,
            history_limit: 500,
        }
    }
}

impl TillConfig {
    /// Defaults overridden by environment variables.
    ///
    /// ## Environment Variables
    /// - `APOTHECARY_STORE_NAME`
    /// - `APOTHECARY_DB_PATH`
    /// - `APOTHECARY_ORPHAN_GRACE_MINUTES`
    /// - `APOTHECARY_HISTORY_LIMIT`
    pub fn from_env() -> Self {
        let mut config = TillConfig::default();

        if let Ok(name) = std::env::var("APOTHECARY_STORE_NAME") {
            config.store_name = name;
        }

        if let Ok(path) = std::env::var("APOTHECARY_DB_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(minutes) = env_number::<i64>("APOTHECARY_ORPHAN_GRACE_MINUTES") {
            config.orphan_grace_minutes = minutes.max(0);
        }

        if let Some(limit) = env_number::<u32>("APOTHECARY_HISTORY_LIMIT") {
            config.history_limit = limit;
        }

        config
    }

    /// The database file to open, creating its directory when needed.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.apothecary.till/apothecary.db`
    /// - **Windows**: `%APPDATA%\apothecary\till\data\apothecary.db`
    /// - **Linux**: `~/.local/share/till/apothecary.db`
    pub fn resolve_database_path(&self) -> ApiResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "apothecary", "till")
            .ok_or_else(|| ApiError::internal("Could not determine app data directory"))?;
        let data_dir = dirs.data_dir();

        std::fs::create_dir_all(data_dir).map_err(|e| {
            ApiError::internal(format!(
                "Could not create {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        Ok(data_dir.join("apothecary.db"))
    }

    /// Formats an amount with the configured symbol.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = TillConfig::default();
    /// assert_eq!(config.format_currency(Money::from_paise(1234)), "₹12.34");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let minor = amount.paise();
        let divisor = 10_i64.pow(u32::from(self.currency_decimals));
        // Stored amounts always carry two decimals.
        let scaled = match self.currency_decimals {
            2 => minor,
            d if d > 2 => minor * 10_i64.pow(u32::from(d) - 2),
            d => minor / 10_i64.pow(2 - u32::from(d)),
        };
        let whole = (scaled / divisor).abs();
        let frac = (scaled % divisor).abs();

        let sign = if scaled < 0 { "-" } else { "" };
        if self.currency_decimals == 0 {
            return format!("{}{}{}", sign, self.currency_symbol, whole);
        }
        format!(
            "{}{}{}.{:0width$}",
            sign,
            self.currency_symbol,
            whole,
            frac,
            width = usize::from(self.currency_decimals)
        )
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
