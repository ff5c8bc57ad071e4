//! Configuration from BFDB_* environment variables
//!
//! These tests mutate the process environment and run serially.

use bfdb::config::{ENV_BATCH_SIZE, ENV_LOG, ENV_MAX_SIZE_BYTES, ENV_PATH, ENV_STORAGE};
use bfdb::{BfDb, BfDbConfig, BfDbError, StorageBackend};
use serial_test::serial;
use std::env;

fn clear_env() {
    for key in [ENV_STORAGE, ENV_PATH, ENV_BATCH_SIZE, ENV_MAX_SIZE_BYTES, ENV_LOG] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = BfDbConfig::from_env().unwrap();
    assert_eq!(config, BfDbConfig::default());
}

#[test]
#[serial]
fn test_from_env_opens_sled() {
    clear_env();
    let temp_dir = tempfile::tempdir().unwrap();
    env::set_var(ENV_STORAGE, "sled");
    env::set_var(ENV_PATH, temp_dir.path().join("env_db"));
    env::set_var(ENV_BATCH_SIZE, "8");
    env::set_var(ENV_MAX_SIZE_BYTES, "2048");
    env::set_var(ENV_LOG, "debug");

    let config = BfDbConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.storage.backend, StorageBackend::Sled);
    assert_eq!(config.query.batch_size, 8);
    assert_eq!(config.query.max_size_bytes, 2048);
    assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Debug);

    let db = BfDb::open(&config).unwrap();
    assert_eq!(db.storage().name(), "kv");
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clear_env();
    env::set_var(ENV_STORAGE, "sled");
    let missing_path = BfDbConfig::from_env();
    clear_env();
    assert!(matches!(missing_path, Err(BfDbError::Config(_))));

    env::set_var(ENV_MAX_SIZE_BYTES, "lots");
    let bad_number = BfDbConfig::from_env();
    clear_env();
    assert!(matches!(bad_number, Err(BfDbError::Config(_))));
}

#[test]
#[serial]
fn test_open_applies_configured_log_level() {
    clear_env();
    env::set_var(ENV_LOG, "debug");
    let config = BfDbConfig::from_env().unwrap();
    clear_env();

    BfDb::open(&config).unwrap();
    if env::var("RUST_LOG").is_err() {
        assert_eq!(log::max_level(), log::LevelFilter::Debug);
    }
}
