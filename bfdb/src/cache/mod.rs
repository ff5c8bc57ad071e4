// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Operation-scoped node cache
//!
//! A [`BfNodeCache`] maps node ids to the instance materialized for them.
//! Lookups and queries that receive a cache return the cached instance for
//! every id they resolve, so within one logical operation an id is fetched
//! from storage at most once and always resolves to the same `Arc`.
//!
//! The cache is owned by a single operation and passed as `&mut`; it is not
//! meant to be shared between concurrent requests.

use crate::ids::BfGid;
use crate::node::BfNode;
use crate::props::BfNodeProps;
use std::collections::HashMap;
use std::sync::Arc;

/// Hit/miss counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct BfNodeCache<P: BfNodeProps> {
    entries: HashMap<BfGid, Arc<BfNode<P>>>,
    stats: CacheStats,
}

impl<P: BfNodeProps> Default for BfNodeCache<P> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<P: BfNodeProps> BfNodeCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an id, counting the hit or miss
    pub fn get(&mut self, id: &BfGid) -> Option<Arc<BfNode<P>>> {
        match self.entries.get(id) {
            Some(node) => {
                self.stats.hits += 1;
                Some(Arc::clone(node))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up an id without touching the counters
    pub fn peek(&self, id: &BfGid) -> Option<&Arc<BfNode<P>>> {
        self.entries.get(id)
    }

    /// Insert a node unless its id is already cached.
    ///
    /// Returns the instance that is cached for the id afterwards, which is
    /// the earlier one when the id was already present.
    pub fn insert(&mut self, node: Arc<BfNode<P>>) -> Arc<BfNode<P>> {
        Arc::clone(self.entries.entry(node.id()).or_insert(node))
    }

    pub fn remove(&mut self, id: &BfGid) -> Option<Arc<BfNode<P>>> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &BfGid) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
