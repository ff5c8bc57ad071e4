//! Storage adapter wrapper that records how often each operation runs

use async_trait::async_trait;
use bfdb::{
    BfDbError, BfDbResult, BfGid, BfMetadata, DbItem, MetadataFilter, PropsFilter, QueryOptions,
    QueryOutput, SortDirection, SortField, StorageAdapter,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct CountingAdapter {
    inner: Arc<dyn StorageAdapter>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    queries: AtomicUsize,
    deletes: AtomicUsize,
    fail_writes: AtomicBool,
    answer_counts: AtomicBool,
}

impl CountingAdapter {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            answer_counts: AtomicBool::new(false),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Make every following put fail with `StorageWrite`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every following query answer with a bare count
    pub fn answer_counts(&self, enabled: bool) {
        self.answer_counts.store(enabled, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
        self.queries.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageAdapter for CountingAdapter {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn get(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<Option<DbItem>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(owner, id).await
    }

    async fn put(&self, props: &Value, metadata: &BfMetadata) -> BfDbResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BfDbError::StorageWrite("backend unavailable".to_string()));
        }
        self.inner.put(props, metadata).await
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
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.answer_counts.load(Ordering::SeqCst) {
            return Ok(QueryOutput::Count(0));
        }
        self.inner
            .query(metadata, props, ids, direction, field, options)
            .await
    }

    async fn delete(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(owner, id).await
    }

    async fn flush(&self) -> BfDbResult<()> {
        self.inner.flush().await
    }
}
