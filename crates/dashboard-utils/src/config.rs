//! Process configuration

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name, used in logs and page titles
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "stock-dashboard".to_string(),
            environment: "development".to_string(),
            log_filter: "info,dashboard_stock=debug".to_string(),
        }
    }
}

impl Config {
    /// Build the configuration from `DASHBOARD_APP_NAME`, `DASHBOARD_ENV`
    /// and `DASHBOARD_LOG`, keeping defaults for unset variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            app_name: lookup("DASHBOARD_APP_NAME").unwrap_or(defaults.app_name),
            environment: lookup("DASHBOARD_ENV").unwrap_or(defaults.environment),
            log_filter: lookup("DASHBOARD_LOG").unwrap_or(defaults.log_filter),
        }
    }
}
