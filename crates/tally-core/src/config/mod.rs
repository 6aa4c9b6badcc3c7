//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `TALLY_CONFIG` env var
//!    (default `config/config.toml`)
//! 3. **Environment variables**: `TALLY__*` env vars override specific
//!    fields, `__` separating nested names
//!
//! Configuration is validated at load time; invalid values (empty URLs,
//! zero TTLs) return errors rather than failing silently later.
//!
//! # Example
//!
//! ```toml
//! [source]
//! orders_url = "https://sheets.example.com/orders/export?format=csv"
//!
//! [cache]
//! report_ttl_minutes = 120
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `3050`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of concurrent requests. Defaults to `100`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3050
}

fn default_max_concurrent_requests() -> usize {
    100
}

/// Upstream CSV export endpoints.
///
/// Each URL must answer a plain GET with `text/csv`-shaped content: a
/// header row followed by data rows. No authentication is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Order export URL.
    #[serde(default = "default_orders_url")]
    pub orders_url: String,

    /// Product sales export URL.
    #[serde(default = "default_product_sales_url")]
    pub product_sales_url: String,

    /// Product master export URL.
    #[serde(default = "default_product_master_url")]
    pub product_master_url: String,

    /// Per-request timeout in seconds. Defaults to `30`.
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
}

fn default_orders_url() -> String {
    "https://sheets.example.com/orders/export?format=csv".to_string()
}

fn default_product_sales_url() -> String {
    "https://sheets.example.com/product-sales/export?format=csv".to_string()
}

fn default_product_master_url() -> String {
    "https://sheets.example.com/product-master/export?format=csv".to_string()
}

fn default_fetch_timeout_seconds() -> u64 {
    30
}

/// Cache TTLs and flight-sweeping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for computed reports, in minutes. Defaults to `120`.
    #[serde(default = "default_report_ttl_minutes")]
    pub report_ttl_minutes: u64,

    /// TTL for the parsed order and product-sales datasets, in minutes.
    /// Defaults to `120`.
    #[serde(default = "default_report_ttl_minutes")]
    pub dataset_ttl_minutes: u64,

    /// TTL for the product master, in minutes. The master changes rarely.
    /// Defaults to `240`.
    #[serde(default = "default_master_ttl_minutes")]
    pub master_ttl_minutes: u64,

    /// Age after which a leaked in-flight registration is swept, in
    /// minutes. Defaults to `5`.
    #[serde(default = "default_flight_max_age_minutes")]
    pub flight_max_age_minutes: u64,

    /// Interval between sweeps, in seconds. Defaults to `300`.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_report_ttl_minutes() -> u64 {
    120
}

fn default_master_ttl_minutes() -> u64 {
    240
}

fn default_flight_max_age_minutes() -> u64 {
    5
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

/// Aggregation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Width of the monthly series window, in months (current month
    /// included). Defaults to `13`.
    #[serde(default = "default_window_months")]
    pub window_months: usize,

    /// Default top-N truncation for rankings. Defaults to `20`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Large-category tag of the specialized ranking and the customer
    /// alcohol flag. Must match the taxonomy of the product master sheet.
    #[serde(default = "default_alcohol_category")]
    pub alcohol_category: String,
}

fn default_window_months() -> usize {
    13
}

fn default_limit() -> usize {
    20
}

fn default_alcohol_category() -> String {
    "alcohol".to_string()
}

/// AI chat endpoint settings.
///
/// The provider only turns a pre-computed report digest into prose; when
/// disabled (or when the key env var is unset) the chat endpoint answers
/// 503 and everything else works normally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Whether the chat endpoint is enabled. Defaults to `false`.
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    /// Model identifier passed to the provider.
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_chat_api_key_env")]
    pub api_key_env: String,
}

fn default_chat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chat_api_key_env() -> String {
    "TALLY_CHAT_API_KEY".to_string()
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "debug", "info", "warn"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment name. Defaults to `"development"`.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            orders_url: "https://sheets.example.com/orders/export?format=csv".to_string(),
            product_sales_url: "https://sheets.example.com/product-sales/export?format=csv"
                .to_string(),
            product_master_url: "https://sheets.example.com/product-master/export?format=csv"
                .to_string(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            report_ttl_minutes: 120,
            dataset_ttl_minutes: 120,
            master_ttl_minutes: 240,
            flight_max_age_minutes: 5,
            sweep_interval_seconds: 300,
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self { window_months: 13, default_limit: 20, alcohol_category: "alcohol".to_string() }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "TALLY_CHAT_API_KEY".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            reports: ReportsConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn report_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.report_ttl_minutes as i64)
    }

    #[must_use]
    pub fn dataset_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.dataset_ttl_minutes as i64)
    }

    #[must_use]
    pub fn master_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.master_ttl_minutes as i64)
    }

    #[must_use]
    pub fn flight_max_age(&self) -> StdDuration {
        StdDuration::from_secs(self.flight_max_age_minutes * 60)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_seconds)
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// Environment variables with the `TALLY__` prefix override any field,
    /// `__` separating nested names (e.g. `TALLY__SERVER__BIND_PORT=8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        // Every field carries a serde default, so a partial (or absent)
        // file deserializes into the compiled defaults.
        builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` (or the path named by
    /// `TALLY_CONFIG`) with fallback to compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("TALLY_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("orders_url", &self.source.orders_url),
            ("product_sales_url", &self.source.product_sales_url),
            ("product_master_url", &self.source.product_master_url),
        ] {
            if url.is_empty() {
                return Err(format!("source.{name} must not be empty"));
            }
            if !url.starts_with("http") {
                return Err(format!("source.{name} is not an HTTP URL: {url}"));
            }
        }

        if self.server.bind_port == 0 {
            return Err("server.bind_port must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return Err("server.max_concurrent_requests must be greater than 0".to_string());
        }
        if self.cache.report_ttl_minutes == 0
            || self.cache.dataset_ttl_minutes == 0
            || self.cache.master_ttl_minutes == 0
        {
            return Err("cache TTLs must be greater than 0".to_string());
        }
        if self.cache.flight_max_age_minutes == 0 {
            return Err("cache.flight_max_age_minutes must be greater than 0".to_string());
        }
        if self.reports.window_months == 0 {
            return Err("reports.window_months must be greater than 0".to_string());
        }
        if self.reports.default_limit == 0 {
            return Err("reports.default_limit must be greater than 0".to_string());
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("logging.format must be 'json' or 'pretty'".to_string());
        }
        if self.chat.enabled && self.chat.base_url.is_empty() {
            return Err("chat.base_url must not be empty when chat is enabled".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.server.bind_port, 3050);
        assert_eq!(config.cache.report_ttl_minutes, 120);
        assert_eq!(config.cache.master_ttl_minutes, 240);
        assert_eq!(config.reports.window_months, 13);
        assert_eq!(config.reports.default_limit, 20);
        assert!(!config.chat.enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.source.orders_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.source.orders_url = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.report_ttl_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[server]
bind_port = 8080

[source]
orders_url = "https://example.com/orders.csv"
product_sales_url = "https://example.com/sales.csv"
product_master_url = "https://example.com/master.csv"

[cache]
report_ttl_minutes = 60
dataset_ttl_minutes = 60
master_ttl_minutes = 120
flight_max_age_minutes = 5
sweep_interval_seconds = 300
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.bind_port, 8080);
        assert_eq!(config.source.orders_url, "https://example.com/orders.csv");
        assert_eq!(config.cache.report_ttl_minutes, 60);
        // Unspecified sections keep their defaults.
        assert_eq!(config.reports.window_months, 13);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_durations() {
        let cache = CacheConfig::default();
        assert_eq!(cache.report_ttl(), chrono::Duration::minutes(120));
        assert_eq!(cache.flight_max_age(), StdDuration::from_secs(300));
    }
}
