//! Main application configuration
//!
//! This module defines the primary configuration structures for the cube-arena
//! match service. Configuration is layered: built-in defaults, then an optional
//! TOML file, then environment variable overrides.

use crate::config::rating::RatingSettings;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub matchplay: MatchSettings,
    pub rating: RatingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check endpoint
    pub health_port: u16,
    /// Interval between background metric refreshes in seconds
    pub metrics_interval_seconds: u64,
    /// Maximum time allowed for graceful shutdown in seconds
    pub shutdown_timeout_seconds: u64,
}

/// HTTP and WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind the API server to
    pub host: String,
    /// API server port
    pub port: u16,
    /// Interval between WebSocket heartbeat pings in seconds
    pub heartbeat_interval_seconds: u64,
    /// Time allowed for a single event delivery in milliseconds
    pub send_timeout_ms: u64,
}

/// Token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Shared secret used to verify bearer tokens
    pub token_secret: String,
}

/// Match coordination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Number of moves in a generated scramble
    pub scramble_length: usize,
    /// Interval between sweeps of unused per-key locks in seconds
    pub lock_prune_interval_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            matchplay: MatchSettings::default(),
            rating: RatingSettings::default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "cube-arena".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            metrics_interval_seconds: 10,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            heartbeat_interval_seconds: 30,
            send_timeout_ms: 5000,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_secret: "change-me".to_string(),
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            scramble_length: 3,
            lock_prune_interval_seconds: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(interval) = env::var("METRICS_INTERVAL_SECONDS") {
            self.service.metrics_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid METRICS_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Server settings
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid SERVER_PORT value: {}", port))?;
        }
        if let Ok(interval) = env::var("HEARTBEAT_INTERVAL_SECONDS") {
            self.server.heartbeat_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid HEARTBEAT_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(timeout) = env::var("SEND_TIMEOUT_MS") {
            self.server.send_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SEND_TIMEOUT_MS value: {}", timeout))?;
        }

        // Auth settings
        if let Ok(secret) = env::var("TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }

        // Match settings
        if let Ok(length) = env::var("SCRAMBLE_LENGTH") {
            self.matchplay.scramble_length = length
                .parse()
                .map_err(|_| anyhow!("Invalid SCRAMBLE_LENGTH value: {}", length))?;
        }
        if let Ok(interval) = env::var("LOCK_PRUNE_INTERVAL_SECONDS") {
            self.matchplay.lock_prune_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid LOCK_PRUNE_INTERVAL_SECONDS value: {}", interval))?;
        }

        Ok(())
    }

    /// Get heartbeat interval as Duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.server.heartbeat_interval_seconds)
    }

    /// Get event delivery timeout as Duration
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.server.send_timeout_ms)
    }

    /// Get metrics refresh interval as Duration
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.service.metrics_interval_seconds)
    }

    /// Get lock prune interval as Duration
    pub fn lock_prune_interval(&self) -> Duration {
        Duration::from_secs(self.matchplay.lock_prune_interval_seconds)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }

    // Validate timing settings
    if config.server.heartbeat_interval_seconds == 0 {
        return Err(anyhow!("Heartbeat interval must be greater than 0"));
    }
    if config.server.send_timeout_ms == 0 {
        return Err(anyhow!("Send timeout must be greater than 0"));
    }
    if config.service.metrics_interval_seconds == 0 {
        return Err(anyhow!("Metrics interval must be greater than 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate auth settings
    if config.auth.token_secret.is_empty() {
        return Err(anyhow!("Token secret cannot be empty"));
    }

    // Validate match settings
    if config.matchplay.scramble_length == 0 {
        return Err(anyhow!("Scramble length must be greater than 0"));
    }

    config.rating.validate()?;

    Ok(())
}
