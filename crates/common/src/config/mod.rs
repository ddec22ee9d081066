//! Configuration management for BD Property services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Plain `PORT` and `DATABASE_URL` variables
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Listing store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Listing query policies
    #[serde(default)]
    pub listings: ListingsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Which store implementation backs the listing service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Store implementation
    #[serde(default)]
    pub backend: StoreBackend,

    /// Primary database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// JSON file with listings loaded by the memory backend
    pub seed_path: Option<String>,
}

/// Listing field the `status` query parameter filters on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    /// The listing's own `status` string
    #[default]
    Status,
    /// The sub-purpose id nested under `purpose`
    SubPurpose,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_limits"))]
pub struct ListingsConfig {
    /// Page size when `limit` is absent or invalid
    #[serde(default = "default_page_limit")]
    #[validate(range(min = 1))]
    pub default_limit: u64,

    /// Upper bound applied to `limit`
    #[serde(default = "default_max_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub max_limit: u64,

    #[serde(default)]
    pub status_field: StatusField,

    /// Location values that disable the location filter entirely
    #[serde(default)]
    pub location_wildcards: Vec<String>,

    #[serde(default)]
    #[validate(nested)]
    pub related: RelatedPolicy,
}

/// Criteria used to pick related listings for the detail view
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RelatedPolicy {
    /// Maximum number of related listings returned
    #[serde(default = "default_related_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: u64,

    #[serde(default = "default_true")]
    pub match_type: bool,

    #[serde(default = "default_true")]
    pub match_sub_type: bool,

    #[serde(default)]
    pub match_location: bool,

    #[serde(default)]
    pub match_purpose: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name attached to log output
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_database_url() -> String { "postgres://localhost/bdproperty".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_page_limit() -> u64 { 20 }
fn default_max_limit() -> u64 { 100 }
fn default_related_limit() -> u64 { 3 }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "bdproperty".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }

fn validate_limits(listings: &ListingsConfig) -> Result<(), ValidationError> {
    if listings.default_limit > listings.max_limit {
        return Err(ValidationError::new("default_limit_exceeds_max_limit"));
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // The two values hosting platforms hand out directly
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints on the loaded values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listings
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid listings config: {}", e)))
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            seed_path: None,
        }
    }
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_limit(),
            status_field: StatusField::default(),
            location_wildcards: Vec::new(),
            related: RelatedPolicy::default(),
        }
    }
}

impl Default for RelatedPolicy {
    fn default() -> Self {
        Self {
            limit: default_related_limit(),
            match_type: true,
            match_sub_type: true,
            match_location: false,
            match_purpose: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: false,
        }
    }
}
