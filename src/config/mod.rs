//! Configuration module for Memory-Inspect
//!
//! Provides configuration loading, validation, and default settings for the
//! scanner, the struct dissector and the process backend.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{
    load_config, Config, ConfigError, ConfigLoader, DissectConfig, LoggingConfig, ProcessConfig,
    ScannerConfig, DEFAULT_CONFIG_FILE,
};
pub use validator::{validate_config, ConfigValidator, MAX_WINDOW_SIZE};

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
