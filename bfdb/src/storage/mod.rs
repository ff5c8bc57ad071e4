// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage adapter contract and implementations
//!
//! The node and edge layers only ever talk to a [`StorageAdapter`]. Backends:
//! - [`InMemoryAdapter`]: process-local per-class maps, for tests and ephemeral graphs
//! - [`KvStorageAdapter`]: records in a key/value tree through a [`StorageDriver`]
//!
//! # Architecture
//!
//! ```text
//! NodeRepository / EdgeRepository (typed nodes, edges, caches)
//!     ↓
//! StorageAdapter (get / put / query / delete over DbItem)
//!     ↓
//! InMemoryAdapter | KvStorageAdapter → StorageDriver (Sled, Memory)
//! ```

mod kv_adapter;
mod memory_adapter;
mod persistent;
pub mod query;

pub use kv_adapter::KvStorageAdapter;
pub use memory_adapter::InMemoryAdapter;
pub use persistent::{create_storage_driver, StorageDriver, StorageDriverError, StorageTree, StorageType};
pub use query::{CursorValue, QueryOptions, SortDirection, SortField};

use crate::error::BfDbResult;
use crate::ids::BfGid;
use crate::metadata::{BfMetadata, MetadataFilter};
use crate::props::PropsFilter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted record: props as a JSON object plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbItem {
    pub props: Value,
    pub metadata: BfMetadata,
}

/// Result of [`StorageAdapter::query`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Items(Vec<DbItem>),
    /// Returned when `QueryOptions::count_only` is set
    Count(usize),
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Items(items) => items.len(),
            QueryOutput::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backend contract for the graph layer.
///
/// Implementations map their own failures to `StorageWrite` (put/delete) and
/// `StorageQuery` (get/query). Absence is never an error at this level: `get`
/// returns `None` and `query` returns no rows.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch one record. `owner` scopes the lookup to an organization; `None`
    /// is the unscoped (admin) lookup.
    async fn get(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<Option<DbItem>>;

    /// Insert or replace the record keyed by `metadata.bf_gid`
    async fn put(&self, props: &Value, metadata: &BfMetadata) -> BfDbResult<()>;

    /// Filter, order and page records.
    ///
    /// An empty `ids` slice means no id restriction.
    async fn query(
        &self,
        metadata: &MetadataFilter,
        props: &PropsFilter,
        ids: &[BfGid],
        direction: SortDirection,
        field: &SortField,
        options: &QueryOptions,
    ) -> BfDbResult<QueryOutput>;

    /// Remove a record, returning whether it existed in `owner`'s scope
    async fn delete(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<bool>;

    /// Make completed writes durable; a no-op for volatile backends
    async fn flush(&self) -> BfDbResult<()> {
        Ok(())
    }
}

pub(crate) fn owner_matches(owner: Option<&BfGid>, item: &DbItem) -> bool {
    owner.map_or(true, |oid| &item.metadata.bf_oid == oid)
}
