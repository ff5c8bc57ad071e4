// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Database configuration and logging setup
//!
//! Configuration comes from code (`Default` plus field updates), from serde
//! (any format the caller deserializes), or from `BFDB_*` environment
//! variables via [`BfDbConfig::from_env`].

use crate::error::{BfDbError, BfDbResult};
use crate::storage::query::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_SIZE_BYTES};
use crate::storage::QueryOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_STORAGE: &str = "BFDB_STORAGE";
pub const ENV_PATH: &str = "BFDB_PATH";
pub const ENV_BATCH_SIZE: &str = "BFDB_BATCH_SIZE";
pub const ENV_MAX_SIZE_BYTES: &str = "BFDB_MAX_SIZE_BYTES";
pub const ENV_LOG: &str = "BFDB_LOG";

/// Which storage adapter backs the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Per-class maps held by the adapter itself
    #[default]
    InMemory,
    /// Key/value adapter over the in-memory driver
    Memory,
    /// Key/value adapter over sled on disk
    Sled,
}

impl FromStr for StorageBackend {
    type Err = BfDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-memory" | "inmemory" => Ok(StorageBackend::InMemory),
            "memory" => Ok(StorageBackend::Memory),
            "sled" => Ok(StorageBackend::Sled),
            other => Err(BfDbError::Config(format!(
                "unknown storage backend '{}'. Valid options: in-memory, memory, sled",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::InMemory => "in-memory",
            StorageBackend::Memory => "memory",
            StorageBackend::Sled => "sled",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory; required by `sled`
    pub path: Option<PathBuf>,
}

/// Defaults applied to queries that do not pass their own options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    pub batch_size: usize,
    pub max_size_bytes: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

impl QueryDefaults {
    pub fn to_options(&self) -> QueryOptions {
        let mut options = QueryOptions::new().with_batch_size(self.batch_size);
        options.max_size_bytes = self.max_size_bytes;
        options
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BfDbConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QueryDefaults,
    /// `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default)]
    pub log_level: Option<String>,
}

impl BfDbConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn sled(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Sled,
                path: Some(path.into()),
            },
            ..Self::default()
        }
    }

    /// Build from `BFDB_*` environment variables, defaulting what is unset
    pub fn from_env() -> BfDbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the `BFDB_*` names
    pub fn from_lookup<F>(lookup: F) -> BfDbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(backend) = lookup(ENV_STORAGE) {
            config.storage.backend = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_PATH) {
            config.storage.path = Some(PathBuf::from(path));
        }
        if let Some(batch_size) = lookup(ENV_BATCH_SIZE) {
            config.query.batch_size = parse_number(ENV_BATCH_SIZE, &batch_size)?;
        }
        if let Some(max_size) = lookup(ENV_MAX_SIZE_BYTES) {
            config.query.max_size_bytes = parse_number(ENV_MAX_SIZE_BYTES, &max_size)?;
        }
        config.log_level = lookup(ENV_LOG);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BfDbResult<()> {
        if self.storage.backend == StorageBackend::Sled && self.storage.path.is_none() {
            return Err(BfDbError::Config(
                "sled storage requires a path".to_string(),
            ));
        }
        if self.query.batch_size == 0 {
            return Err(BfDbError::Config("batch_size must be > 0".to_string()));
        }
        if let Some(level) = &self.log_level {
            parse_level(level)?;
        }
        Ok(())
    }

    /// Configured log level, `Warn` when unset
    pub fn level_filter(&self) -> BfDbResult<log::LevelFilter> {
        match &self.log_level {
            Some(level) => parse_level(level),
            None => Ok(log::LevelFilter::Warn),
        }
    }
}

fn parse_number(key: &str, value: &str) -> BfDbResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| BfDbError::Config(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_level(level: &str) -> BfDbResult<log::LevelFilter> {
    level
        .parse()
        .map_err(|_| BfDbError::Config(format!("unknown log level '{}'", level)))
}

/// Initialize `env_logger` at `level`; `RUST_LOG` still overrides it.
///
/// Later calls are ignored, so tests may call this freely.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .is_test(cfg!(test))
        .try_init();
}
