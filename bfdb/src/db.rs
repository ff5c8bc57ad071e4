// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Graph handle
//!
//! [`BfDb`] owns the storage adapter and hands out per-viewer repositories.
//! It is cheap to clone; clones share the same storage.

use crate::config::{init_logging, BfDbConfig, QueryDefaults, StorageBackend};
use crate::edge::EdgeRepository;
use crate::error::{BfDbError, BfDbResult};
use crate::node::NodeRepository;
use crate::props::BfNodeProps;
use crate::storage::{InMemoryAdapter, KvStorageAdapter, StorageAdapter, StorageType};
use crate::viewer::CurrentViewer;
use log::info;
use std::sync::Arc;

#[derive(Clone)]
pub struct BfDb {
    storage: Arc<dyn StorageAdapter>,
    query_defaults: QueryDefaults,
}

impl BfDb {
    /// Open the storage described by `config`.
    ///
    /// A configured log level also installs the `env_logger` backend.
    pub fn open(config: &BfDbConfig) -> BfDbResult<Self> {
        config.validate()?;
        if config.log_level.is_some() {
            init_logging(config.level_filter()?);
        }
        let storage: Arc<dyn StorageAdapter> = match config.storage.backend {
            StorageBackend::InMemory => Arc::new(InMemoryAdapter::new()),
            StorageBackend::Memory => {
                let path = config.storage.path.clone().unwrap_or_default();
                Arc::new(KvStorageAdapter::open(StorageType::Memory, path)?)
            }
            StorageBackend::Sled => {
                let path = config.storage.path.as_ref().ok_or_else(|| {
                    BfDbError::Config("sled storage requires a path".to_string())
                })?;
                Arc::new(KvStorageAdapter::open(StorageType::Sled, path)?)
            }
        };
        info!(
            "Opened bfdb on {} storage ({})",
            config.storage.backend,
            storage.name()
        );
        Ok(Self {
            storage,
            query_defaults: config.query.clone(),
        })
    }

    /// Use an existing adapter, such as a test double or a custom backend
    pub fn with_storage(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            query_defaults: QueryDefaults::default(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub async fn flush(&self) -> BfDbResult<()> {
        self.storage.flush().await
    }

    /// Repository for nodes of type `P` acting as `viewer`
    pub fn nodes<P: BfNodeProps>(&self, viewer: &CurrentViewer) -> NodeRepository<P> {
        NodeRepository::new(Arc::clone(&self.storage), viewer.clone())
            .with_query_defaults(self.query_defaults.to_options())
    }

    /// Edge repository acting as `viewer`
    pub fn edges(&self, viewer: &CurrentViewer) -> EdgeRepository {
        EdgeRepository::new(Arc::clone(&self.storage), viewer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[test]
    fn test_open_backends() {
        let db = BfDb::open(&BfDbConfig::in_memory()).unwrap();
        assert_eq!(db.storage().name(), "in-memory");

        let kv = BfDb::open(&BfDbConfig {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                path: None,
            },
            ..BfDbConfig::default()
        })
        .unwrap();
        assert_eq!(kv.storage().name(), "kv");
    }

    #[test]
    fn test_sled_without_path_is_config_error() {
        let config = BfDbConfig {
            storage: StorageConfig {
                backend: StorageBackend::Sled,
                path: None,
            },
            ..BfDbConfig::default()
        };
        assert!(matches!(BfDb::open(&config), Err(BfDbError::Config(_))));
    }
}
