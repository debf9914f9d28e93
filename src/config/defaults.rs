//! Default configuration values for Memory-Inspect

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub dissect: DissectDefaults,
    pub process: ProcessDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub max_threads: usize,
    pub min_chunks: usize,
    pub start_address: usize,
    pub end_address: usize,
}

/// Default struct dissection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissectDefaults {
    pub window_size: usize,
    pub resolve_rtti: bool,
}

/// Default process access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefaults {
    pub module_cache_ttl_ms: u64,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: Option<String>,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            max_threads: num_cpus::get().min(8),
            min_chunks: 4,
            start_address: 0x10000,
            end_address: 0x7FFF_FFFF_FFFF,
        },
        dissect: DissectDefaults {
            window_size: 0x400,
            resolve_rtti: true,
        },
        process: ProcessDefaults {
            module_cache_ttl_ms: 5000,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: None,
        },
    }
}
