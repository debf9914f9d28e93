//! Configuration loader for Memory-Inspect
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "memory-inspect.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scanner")]
    pub scanner: ScannerConfig,

    #[serde(default = "default_dissect")]
    pub dissect: DissectConfig,

    #[serde(default = "default_process")]
    pub process: ProcessConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Worker threads in the scan pool
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    /// Lower bound on the number of chunks a next scan is split into
    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,
    #[serde(default = "default_start_address")]
    pub start_address: usize,
    #[serde(default = "default_end_address")]
    pub end_address: usize,
}

/// Struct dissection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissectConfig {
    /// Bytes explored below a pointer or a new dissection
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_resolve_rtti")]
    pub resolve_rtti: bool,
}

/// Process access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_module_cache_ttl_ms")]
    pub module_cache_ttl_ms: u64,
}

impl ProcessConfig {
    pub fn module_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.module_cache_ttl_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to this file instead of stderr
    #[serde(default)]
    pub file: Option<String>,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        debug!(path = %self.config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only if the file is missing
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new(DEFAULT_CONFIG_FILE).load_or_default()
}

// Default functions for serde
fn default_scanner() -> ScannerConfig {
    let defaults = default_config().scanner;
    ScannerConfig {
        max_threads: defaults.max_threads,
        min_chunks: defaults.min_chunks,
        start_address: defaults.start_address,
        end_address: defaults.end_address,
    }
}

fn default_dissect() -> DissectConfig {
    let defaults = default_config().dissect;
    DissectConfig {
        window_size: defaults.window_size,
        resolve_rtti: defaults.resolve_rtti,
    }
}

fn default_process() -> ProcessConfig {
    ProcessConfig {
        module_cache_ttl_ms: default_config().process.module_cache_ttl_ms,
    }
}

fn default_logging() -> LoggingConfig {
    let defaults = default_config().logging;
    LoggingConfig {
        level: defaults.level,
        file: defaults.file,
    }
}

// Individual field defaults
fn default_max_threads() -> usize {
    default_config().scanner.max_threads
}

fn default_min_chunks() -> usize {
    default_config().scanner.min_chunks
}

fn default_start_address() -> usize {
    default_config().scanner.start_address
}

fn default_end_address() -> usize {
    default_config().scanner.end_address
}

fn default_window_size() -> usize {
    default_config().dissect.window_size
}

fn default_resolve_rtti() -> bool {
    default_config().dissect.resolve_rtti
}

fn default_module_cache_ttl_ms() -> u64 {
    default_config().process.module_cache_ttl_ms
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scanner: default_scanner(),
            dissect: default_dissect(),
            process: default_process(),
            logging: default_logging(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        default_scanner()
    }
}

impl Default for DissectConfig {
    fn default() -> Self {
        default_dissect()
    }
}
