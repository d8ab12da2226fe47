//! # Configuration Management
//!
//! Centralized configuration for the login (BUCP) and service (BOS) listeners.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults
//!
//! The `root` host is what clients are told to reconnect to, and the base of
//! every URL handed out in login replies.

use crate::account::AccountIdentity;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Login (BUCP) listener port.
pub const BUCP_PORT: u16 = 5190;

/// Service (BOS) listener port.
pub const BOS_PORT: u16 = 5191;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OscarConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Pending-session registry limits
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Accounts seeded into the in-memory store by the bundled server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<AccountIdentity>,
}

impl OscarConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `OSCAR_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("OSCAR_ROOT") {
            self.server.root = root;
        }

        if let Ok(addr) = std::env::var("OSCAR_BUCP_ADDRESS") {
            self.server.bucp_address = addr;
        }

        if let Ok(addr) = std::env::var("OSCAR_BOS_ADDRESS") {
            self.server.bos_address = addr;
        }

        if let Ok(ttl) = std::env::var("OSCAR_REGISTRY_TTL_MS") {
            if let Ok(val) = ttl.parse::<u64>() {
                self.registry.pending_ttl = Duration::from_millis(val);
            }
        }

        if let Ok(max) = std::env::var("OSCAR_REGISTRY_MAX_PENDING") {
            if let Ok(val) = max.parse::<usize>() {
                self.registry.max_pending = val;
            }
        }
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.registry.validate());
        errors.extend(self.logging.validate());

        let mut seen = std::collections::HashSet::new();
        for account in &self.accounts {
            if account.display_name.trim().is_empty() {
                errors.push(format!("Account {} has an empty display name", account.uin));
            } else if !seen.insert(crate::account::normalize(&account.display_name)) {
                errors.push(format!("Duplicate account display name: {}", account.display_name));
            }
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public host name clients reconnect to (e.g., "aim.example.net")
    pub root: String,

    /// Login listener bind address
    pub bucp_address: String,

    /// Service listener bind address
    pub bos_address: String,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: String::from("127.0.0.1"),
            bucp_address: format!("0.0.0.0:{BUCP_PORT}"),
            bos_address: format!("0.0.0.0:{BOS_PORT}"),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Address handed to clients in TLV 0x0005 of a successful login.
    pub fn bos_endpoint(&self) -> String {
        format!("{}:{BOS_PORT}", self.root)
    }

    /// Password recovery page (TLV 0x0054).
    pub fn password_recovery_url(&self) -> String {
        format!("http://{}/passport/forgot.php", self.root)
    }

    /// Error page (TLV 0x0004).
    pub fn error_url(&self) -> String {
        format!("http://{}/", self.root)
    }

    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.root.trim().is_empty() {
            errors.push("Root host cannot be empty".to_string());
        } else if self.root.contains(char::is_whitespace) || self.root.contains('/') {
            errors.push(format!("Invalid root host: '{}'", self.root));
        }

        for (name, address) in [("BUCP", &self.bucp_address), ("BOS", &self.bos_address)] {
            if address.is_empty() {
                errors.push(format!("{name} address cannot be empty"));
            } else if address.parse::<std::net::SocketAddr>().is_err() {
                errors.push(format!(
                    "Invalid {name} address format: '{address}' (expected format: '0.0.0.0:{BUCP_PORT}')"
                ));
            }
        }

        if !self.bucp_address.is_empty() && self.bucp_address == self.bos_address {
            errors.push("BUCP and BOS listeners cannot share an address".to_string());
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Limits on sessions that logged in but have not reached the BOS listener yet
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long an issued cookie stays claimable
    #[serde(with = "duration_serde")]
    pub pending_ttl: Duration,

    /// Maximum pending sessions before the oldest is evicted
    pub max_pending: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::from_secs(600),
            max_pending: 10_000,
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.pending_ttl.as_secs() < 1 {
            errors.push("Pending session TTL too short (minimum: 1s)".to_string());
        } else if self.pending_ttl.as_secs() > 86_400 {
            errors.push("Pending session TTL too long (maximum: 24h)".to_string());
        }

        if self.max_pending == 0 {
            errors.push("Max pending sessions must be greater than 0".to_string());
        } else if self.max_pending > 1_000_000 {
            errors.push(format!(
                "Max pending sessions very high: {} (ensure system resources can support this)",
                self.max_pending
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("oscar-server"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
