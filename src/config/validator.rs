//! Configuration validator for Memory-Inspect
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, DissectConfig, LoggingConfig, ScannerConfig};

/// Largest exploration window accepted for a single dissection
pub const MAX_WINDOW_SIZE: usize = 0x10_0000;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_dissect(&config.dissect)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.max_threads == 0 {
            return Err(ConfigError::Invalid(
                "Scanner threads must be at least 1".to_string(),
            ));
        }

        if scanner.max_threads > 128 {
            return Err(ConfigError::Invalid(
                "Scanner threads cannot exceed 128".to_string(),
            ));
        }

        if scanner.min_chunks == 0 {
            return Err(ConfigError::Invalid(
                "Next scan chunk count must be at least 1".to_string(),
            ));
        }

        if scanner.start_address >= scanner.end_address {
            return Err(ConfigError::Invalid(format!(
                "Scan start address 0x{:X} must be below end address 0x{:X}",
                scanner.start_address, scanner.end_address
            )));
        }

        Ok(())
    }

    fn validate_dissect(dissect: &DissectConfig) -> Result<(), ConfigError> {
        if dissect.window_size == 0 || dissect.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::Invalid(format!(
                "Dissection window size must be between 1 and 0x{:X}",
                MAX_WINDOW_SIZE
            )));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        if matches!(logging.file.as_deref(), Some(file) if file.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "Log file path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
