//! Integration tests for configuration driving the scanner and dissector

use memory_inspect::config::{validate_config, Config, ConfigError, ConfigLoader};
use memory_inspect::core::types::{Address, ScanComparison, ValueType};
use memory_inspect::dissect::{Dissection, Explorer};
use memory_inspect::memory::{MemoryScanner, ScanOptions};
use memory_inspect::process::SnapshotProcess;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory-inspect.toml");
    fs::write(
        &path,
        r#"
[scanner]
max_threads = 2

[dissect]
window_size = 64
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.scanner.max_threads, 2);
    assert_eq!(config.scanner.min_chunks, 4);
    assert_eq!(config.scanner.start_address, 0x10000);
    assert_eq!(config.dissect.window_size, 64);
    assert!(config.dissect.resolve_rtti);
    assert_eq!(config.process.module_cache_ttl(), Duration::from_secs(5));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("saved.toml"));

    let mut config = Config::default();
    config.scanner.end_address = 0x20000;
    config.logging.file = Some("inspect.log".to_string());
    loader.save(&config).unwrap();

    let loaded = loader.load().unwrap();
    assert_eq!(loaded.scanner.end_address, 0x20000);
    assert_eq!(loaded.logging.file.as_deref(), Some("inspect.log"));
}

#[test]
fn test_missing_and_broken_files() {
    let dir = TempDir::new().unwrap();
    let missing = ConfigLoader::new(dir.path().join("absent.toml"));
    assert!(matches!(missing.load(), Err(ConfigError::FileNotFound(_))));
    assert_eq!(missing.load_or_default().unwrap().dissect.window_size, 0x400);

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[scanner\nmax_threads = ").unwrap();
    assert!(matches!(
        ConfigLoader::new(&broken).load_or_default(),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = Config::default();
    config.scanner.start_address = 0x20000;
    config.scanner.end_address = 0x10000;
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));

    let mut config = Config::default();
    config.logging.level = "loud".to_string();
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_config_drives_components() {
    let mut config = Config::default();
    config.scanner.max_threads = 1;
    config.scanner.min_chunks = 1;
    config.dissect.window_size = 0x10;
    config.dissect.resolve_rtti = false;

    let process = Arc::new(SnapshotProcess::with_buffer(Address::new(0x10000), vec![0; 0x100]).unwrap());

    let scanner = MemoryScanner::with_config(Arc::clone(&process), &config.scanner).unwrap();
    let count = scanner
        .first_scan(ScanOptions::new(ValueType::U16, ScanComparison::UnknownInitialValue))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(count, 0x80);

    let explorer = Explorer::from(&config.dissect);
    let dissection = Dissection::new(&*process, "zeros", Address::new(0x10000), &explorer);
    assert_eq!(dissection.root().size, 0x10);
    assert_eq!(dissection.root().children().len(), 4);
}
