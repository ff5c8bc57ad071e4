// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage adapter
//!
//! Holds one map per class name from `bf_gid` to record. Queries are a linear
//! scan with in-process filtering. The map lives as long as the adapter
//! instance; tests construct one per case or call [`InMemoryAdapter::clear_all`]
//! between cases.

use super::query::{execute_query, row_matches};
use super::{owner_matches, DbItem, QueryOptions, QueryOutput, SortDirection, SortField, StorageAdapter};
use crate::error::BfDbResult;
use crate::ids::BfGid;
use crate::metadata::{BfMetadata, MetadataFilter};
use crate::props::PropsFilter;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryAdapter {
    classes: RwLock<HashMap<String, HashMap<BfGid, DbItem>>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record of every class
    pub fn clear_all(&self) {
        let mut classes = self.classes.write();
        debug!(
            "InMemoryAdapter.clear_all: dropping {} classes",
            classes.len()
        );
        classes.clear();
    }

    /// Drop every record of one class
    pub fn clear_class(&self, class_name: &str) {
        self.classes.write().remove(class_name);
    }

    /// Total number of records across classes
    pub fn len(&self) -> usize {
        self.classes.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records of one class
    pub fn items_of_class(&self, class_name: &str) -> Vec<DbItem> {
        self.classes
            .read()
            .get(class_name)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageAdapter for InMemoryAdapter {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn get(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<Option<DbItem>> {
        debug!("InMemoryAdapter.get({:?}, {})", owner, id);
        let classes = self.classes.read();
        let found = classes
            .values()
            .find_map(|items| items.get(id))
            .filter(|item| owner_matches(owner, item))
            .cloned();
        Ok(found)
    }

    async fn put(&self, props: &Value, metadata: &BfMetadata) -> BfDbResult<()> {
        debug!(
            "InMemoryAdapter.put {}#{}",
            metadata.class_name, metadata.bf_gid
        );
        let item = DbItem {
            props: props.clone(),
            metadata: metadata.clone(),
        };
        self.classes
            .write()
            .entry(metadata.class_name.clone())
            .or_default()
            .insert(metadata.bf_gid.clone(), item);
        Ok(())
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
        let rows: Vec<DbItem> = {
            let classes = self.classes.read();
            let scan: Box<dyn Iterator<Item = &DbItem>> = match &metadata.class_name {
                Some(class_name) => match classes.get(class_name) {
                    Some(items) => Box::new(items.values()),
                    None => Box::new(std::iter::empty()),
                },
                None => Box::new(classes.values().flat_map(HashMap::values)),
            };
            scan.filter(|item| row_matches(item, metadata, props, ids))
                .cloned()
                .collect()
        };
        debug!(
            "InMemoryAdapter.query matched {} rows ({} {})",
            rows.len(),
            field,
            direction
        );
        execute_query(rows, direction, field, options)
    }

    async fn delete(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<bool> {
        debug!("InMemoryAdapter.delete({:?}, {})", owner, id);
        let mut classes = self.classes.write();
        for items in classes.values_mut() {
            let owned = items
                .get(id)
                .map(|item| owner_matches(owner, item))
                .unwrap_or(false);
            if owned {
                items.remove(id);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
