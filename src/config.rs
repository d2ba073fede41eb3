//! Configuration management for the postbox exporter
//!
//! This module provides unified configuration management with automatic
//! first-run initialization, multi-source loading, and zero-config defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::app::{BatchConfig, HttpConfig, TransferConfig, WaitConfig};
use crate::constants::{batch, http, transfer, wait};
use crate::errors::{AppError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Locator resolution wait settings
    pub wait: WaitConfigToml,
    /// Transfer retry settings
    pub transfer: TransferConfigToml,
    /// Batch iteration settings
    pub batch: BatchConfigToml,
    /// HTTP transport settings
    pub http: HttpConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly wait configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfigToml {
    /// Interval between probe evaluations in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum time to wait for a resolved locator in milliseconds
    pub timeout_ms: u64,
}

impl Default for WaitConfigToml {
    fn default() -> Self {
        Self {
            poll_interval_ms: wait::POLL_INTERVAL.as_millis() as u64,
            timeout_ms: wait::RESOLVE_TIMEOUT.as_millis() as u64,
        }
    }
}

/// TOML-friendly transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfigToml {
    /// Maximum transport attempts per transfer
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Grace delay after a completed attempt in milliseconds
    pub grace_delay_ms: u64,
}

impl Default for TransferConfigToml {
    fn default() -> Self {
        Self {
            max_attempts: transfer::MAX_ATTEMPTS,
            retry_delay_ms: transfer::RETRY_DELAY.as_millis() as u64,
            grace_delay_ms: transfer::GRACE_DELAY.as_millis() as u64,
        }
    }
}

/// TOML-friendly batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfigToml {
    /// Delay after collapsing an item in milliseconds
    pub settle_delay_ms: u64,
}

impl Default for BatchConfigToml {
    fn default() -> Self {
        Self {
            settle_delay_ms: batch::SETTLE_DELAY.as_millis() as u64,
        }
    }
}

/// TOML-friendly HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfigToml {
    /// User agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Directory downloaded artifacts are written into
    pub destination_root: PathBuf,
}

impl Default for HttpConfigToml {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            request_timeout_secs: http::REQUEST_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            destination_root: PathBuf::from(""), // Empty means use the download directory
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            colored_output: true,
        }
    }
}

impl LoggingConfig {
    /// Filter built from the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::new(&self.level)
    }

    /// Install the global tracing subscriber; `RUST_LOG` overrides the
    /// configured level when set
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| self.env_filter());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(self.colored_output)
            .init();
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (BatchConfig, HttpConfig) {
        (
            BatchConfig {
                wait: self.wait.to_runtime_config(),
                transfer: self.transfer.to_runtime_config(),
                settle_delay: Duration::from_millis(self.batch.settle_delay_ms),
            },
            self.http.to_runtime_config(),
        )
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = if let Some(ref path) = config_file_override {
            // Use explicit config file
            Some(path.clone())
        } else {
            // Look for default config file locations
            Self::find_config_file()?
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(AppError::generic(format!(
                    "Specified config file not found: {}",
                    path.display()
                )));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file at the user config location if none
    /// exists
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        let config_path = Self::get_default_config_path()?;
        Self::initialize_at(&config_path).await?;
        Ok(Some(config_path))
    }

    /// Write the default config file to `path` unless it already exists
    async fn initialize_at(path: &Path) -> Result<()> {
        if path.exists() {
            // Config already exists, nothing to do
            return Ok(());
        }

        info!("Creating default configuration file...");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let config_content = Self::generate_default_config_content();

        tokio::fs::write(path, config_content).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Created default configuration file: {}", path.display());
        Ok(())
    }

    /// Validate the loaded values before they become runtime configuration
    fn validate(&self) -> Result<()> {
        let (batch_config, _) = self.to_runtime_config();
        batch_config.validate().map_err(AppError::generic)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Result<Option<PathBuf>> {
        let search_paths = vec![
            // Project-local config
            PathBuf::from("./postbox-exporter.toml"),
            PathBuf::from("./config.toml"),
            // User config
            Self::get_default_config_path()?,
            // System config (Unix only)
            #[cfg(unix)]
            PathBuf::from("/etc/postbox-exporter/config.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Ok(Some(path));
            }
        }

        debug!("No config file found in standard locations");
        Ok(None)
    }

    /// Get the default config file path for the current user
    fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join("postbox-exporter").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            AppError::generic(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Postbox Exporter Configuration
# This file was automatically generated on first run.
# You can customize any of these settings to suit your needs.

[wait]
# How the exporter waits for a revealed item's download link
poll_interval_ms = {}
timeout_ms = {}

[transfer]
# Retry behavior for individual downloads
max_attempts = {}
retry_delay_ms = {}
grace_delay_ms = {}

[batch]
# Delay between items, so collapse and the next reveal do not race
settle_delay_ms = {}

[http]
# HTTP transport settings
user_agent = "{}"
request_timeout_secs = {}
connect_timeout_secs = {}
destination_root = ""  # Empty = current directory

[logging]
# Logging configuration
level = "info"  # error, warn, info, debug, trace
colored_output = true
"#,
            wait::POLL_INTERVAL.as_millis(),
            wait::RESOLVE_TIMEOUT.as_millis(),
            transfer::MAX_ATTEMPTS,
            transfer::RETRY_DELAY.as_millis(),
            transfer::GRACE_DELAY.as_millis(),
            batch::SETTLE_DELAY.as_millis(),
            http::USER_AGENT,
            http::REQUEST_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
        )
    }
}

impl WaitConfigToml {
    /// Convert to runtime WaitConfig
    pub fn to_runtime_config(&self) -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl TransferConfigToml {
    /// Convert to runtime TransferConfig
    pub fn to_runtime_config(&self) -> TransferConfig {
        TransferConfig {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            grace_delay: Duration::from_millis(self.grace_delay_ms),
        }
    }
}

impl HttpConfigToml {
    /// Convert to runtime HttpConfig
    pub fn to_runtime_config(&self) -> HttpConfig {
        // An empty destination resolves to the current directory
        let destination_root = if self.destination_root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.destination_root.clone()
        };

        HttpConfig {
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            destination_root,
        }
    }
}
