// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage adapter over a key/value driver
//!
//! Every record lives in a single tree keyed by `bf_gid`. The value is the
//! JSON-encoded [`DbItem`] followed by a little-endian CRC32 of those bytes:
//!
//! ```text
//! [json bytes ...][crc32: u32 LE]
//! ```

use super::persistent::{
    create_storage_driver, StorageDriver, StorageDriverError, StorageTree, StorageType,
};
use super::query::{execute_query, row_matches};
use super::{owner_matches, DbItem, QueryOptions, QueryOutput, SortDirection, SortField, StorageAdapter};
use crate::error::{BfDbError, BfDbResult};
use crate::ids::BfGid;
use crate::metadata::{BfMetadata, MetadataFilter};
use crate::props::PropsFilter;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Tree holding every node and edge record
pub const ITEMS_TREE: &str = "bfdb_items";

const CHECKSUM_LEN: usize = 4;

pub struct KvStorageAdapter {
    driver: Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>,
    items: Box<dyn StorageTree>,
}

fn write_error(e: StorageDriverError) -> BfDbError {
    BfDbError::StorageWrite(e.to_string())
}

fn query_error(e: StorageDriverError) -> BfDbError {
    BfDbError::StorageQuery(e.to_string())
}

/// Frame a record as JSON plus checksum
fn encode_item(item: &DbItem) -> BfDbResult<Vec<u8>> {
    let mut buffer = serde_json::to_vec(item)?;
    let checksum = crc32fast::hash(&buffer);
    buffer.extend_from_slice(&checksum.to_le_bytes());
    Ok(buffer)
}

fn decode_item(data: &[u8]) -> Result<DbItem, StorageDriverError> {
    if data.len() < CHECKSUM_LEN {
        return Err(StorageDriverError::Corrupted("record too small".to_string()));
    }
    let (payload, checksum_bytes) = data.split_at(data.len() - CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(checksum_bytes);
    if u32::from_le_bytes(expected) != crc32fast::hash(payload) {
        return Err(StorageDriverError::Corrupted("checksum mismatch".to_string()));
    }
    Ok(serde_json::from_slice(payload)?)
}

impl KvStorageAdapter {
    /// Wrap an already opened driver
    pub fn new(driver: Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>) -> BfDbResult<Self> {
        let items = driver.open_tree(ITEMS_TREE).map_err(query_error)?;
        info!(
            "KV storage adapter ready on {} driver ({} records)",
            driver.storage_type(),
            items.len().map_err(query_error)?
        );
        Ok(Self { driver, items })
    }

    /// Open a driver of `storage_type` at `path` and wrap it
    pub fn open<P: AsRef<Path>>(storage_type: StorageType, path: P) -> BfDbResult<Self> {
        let driver = create_storage_driver(storage_type, path).map_err(|e| {
            BfDbError::Config(format!("cannot open {} storage: {}", storage_type, e))
        })?;
        Self::new(driver)
    }

    pub fn storage_type(&self) -> StorageType {
        self.driver.storage_type()
    }

    fn read(&self, id: &BfGid) -> BfDbResult<Option<DbItem>> {
        match self.items.get(id.as_bytes()).map_err(query_error)? {
            Some(bytes) => decode_item(&bytes).map(Some).map_err(|e| {
                warn!("Unreadable record {}: {}", id, e);
                query_error(e)
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StorageAdapter for KvStorageAdapter {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn get(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<Option<DbItem>> {
        debug!("KvStorageAdapter.get({:?}, {})", owner, id);
        Ok(self.read(id)?.filter(|item| owner_matches(owner, item)))
    }

    async fn put(&self, props: &Value, metadata: &BfMetadata) -> BfDbResult<()> {
        debug!(
            "KvStorageAdapter.put {}#{}",
            metadata.class_name, metadata.bf_gid
        );
        let item = DbItem {
            props: props.clone(),
            metadata: metadata.clone(),
        };
        let bytes = encode_item(&item)
            .map_err(|e| BfDbError::StorageWrite(format!("encoding {}: {}", metadata.bf_gid, e)))?;
        self.items
            .insert(metadata.bf_gid.as_bytes(), &bytes)
            .map_err(write_error)
    }

    async fn query(
        &self,
        metadata: &MetadataFilter,
        props: &PropsFilter,
        ids: &[BfGid],
        direction: SortDirection,
        field: &SortField,
        options: &QueryOptions,
    ) -> BfDbResult<QueryOutput> {
        let mut rows = Vec::new();
        if ids.is_empty() {
            for entry in self.items.iter().map_err(query_error)? {
                let (_, value) = entry.map_err(query_error)?;
                let item = decode_item(&value).map_err(query_error)?;
                if row_matches(&item, metadata, props, ids) {
                    rows.push(item);
                }
            }
        } else {
            // Repeated ids name the same row once
            let mut seen = HashSet::new();
            let keys: Vec<&[u8]> = ids
                .iter()
                .filter(|id| seen.insert(*id))
                .map(BfGid::as_bytes)
                .collect();
            for value in self.items.batch_get(&keys).map_err(query_error)?.into_iter().flatten() {
                let item = decode_item(&value).map_err(query_error)?;
                if row_matches(&item, metadata, props, ids) {
                    rows.push(item);
                }
            }
        }
        debug!(
            "KvStorageAdapter.query matched {} rows ({} {})",
            rows.len(),
            field,
            direction
        );
        execute_query(rows, direction, field, options)
    }

    async fn delete(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<bool> {
        debug!("KvStorageAdapter.delete({:?}, {})", owner, id);
        let owned = self
            .read(id)?
            .map(|item| owner_matches(owner, &item))
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }
        self.items.remove(id.as_bytes()).map_err(write_error)
    }

    async fn flush(&self) -> BfDbResult<()> {
        self.items.flush().map_err(write_error)?;
        self.driver.flush().map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{generate_metadata, MetadataOverrides};
    use crate::storage::persistent::memory::MemoryStorageDriver;
    use crate::viewer::CurrentViewer;
    use serde_json::json;

    fn memory_adapter() -> KvStorageAdapter {
        KvStorageAdapter::new(Box::new(MemoryStorageDriver::new())).unwrap()
    }

    fn metadata(class_name: &str) -> BfMetadata {
        generate_metadata(
            &CurrentViewer::new("org", "person"),
            class_name,
            MetadataOverrides::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let item = DbItem {
            props: json!({"name": "x"}),
            metadata: metadata("BfPerson"),
        };
        let mut bytes = encode_item(&item).unwrap();
        assert_eq!(decode_item(&bytes).unwrap(), item);

        bytes[2] ^= 0xff;
        assert!(matches!(
            decode_item(&bytes),
            Err(StorageDriverError::Corrupted(_))
        ));
        assert!(decode_item(&[1, 2]).is_err());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let adapter = memory_adapter();
        let meta = metadata("BfPerson");
        adapter.put(&json!({"name": "a"}), &meta).await.unwrap();

        let found = adapter.get(None, &meta.bf_gid).await.unwrap().unwrap();
        assert_eq!(found.props, json!({"name": "a"}));
        let stranger = BfGid::from("other-org");
        assert!(adapter.get(Some(&stranger), &meta.bf_gid).await.unwrap().is_none());

        assert!(!adapter.delete(Some(&stranger), &meta.bf_gid).await.unwrap());
        assert!(adapter.delete(None, &meta.bf_gid).await.unwrap());
        assert!(adapter.get(None, &meta.bf_gid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_with_id_list() {
        let adapter = memory_adapter();
        let mut ids = Vec::new();
        for i in 0..3 {
            let meta = metadata("BfPerson");
            adapter.put(&json!({"n": i}), &meta).await.unwrap();
            ids.push(meta.bf_gid);
        }

        let output = adapter
            .query(
                &MetadataFilter::new().class_name("BfPerson"),
                &PropsFilter::new(),
                &[ids[2].clone(), ids[0].clone(), BfGid::from("missing")],
                SortDirection::Asc,
                &SortField::SortValue,
                &QueryOptions::new(),
            )
            .await
            .unwrap();
        let QueryOutput::Items(items) = output else {
            panic!("expected items");
        };
        let found: Vec<_> = items.into_iter().map(|i| i.metadata.bf_gid).collect();
        assert_eq!(found, vec![ids[0].clone(), ids[2].clone()]);
    }

    #[tokio::test]
    async fn test_repeated_ids_return_one_row() {
        let adapter = memory_adapter();
        let meta = metadata("BfOrganization");
        adapter.put(&json!({"name": "acme"}), &meta).await.unwrap();

        let output = adapter
            .query(
                &MetadataFilter::new(),
                &PropsFilter::new(),
                &[meta.bf_gid.clone(), meta.bf_gid.clone()],
                SortDirection::Asc,
                &SortField::SortValue,
                &QueryOptions::new(),
            )
            .await
            .unwrap();
        let QueryOutput::Items(items) = output else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
    }

    #[cfg(feature = "sled-backend")]
    #[tokio::test]
    async fn test_sled_records_survive_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let meta = metadata("BfPerson");
        {
            let adapter = KvStorageAdapter::open(StorageType::Sled, temp_dir.path()).unwrap();
            adapter.put(&json!({"name": "durable"}), &meta).await.unwrap();
            adapter.flush().await.unwrap();
        }

        let adapter = KvStorageAdapter::open(StorageType::Sled, temp_dir.path()).unwrap();
        assert_eq!(adapter.storage_type(), StorageType::Sled);
        let found = adapter.get(None, &meta.bf_gid).await.unwrap().unwrap();
        assert_eq!(found.props["name"], "durable");
    }
}
