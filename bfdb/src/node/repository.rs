// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Per-type node factory
//!
//! A [`NodeRepository<P>`] creates, finds and queries nodes of one props type
//! on behalf of one viewer. Every record it returns is materialized as
//! `BfNode<P>`; a stored record of another class is a `ClassMismatch`.

use super::BfNode;
use crate::cache::BfNodeCache;
use crate::error::{BfDbError, BfDbResult};
use crate::ids::BfGid;
use crate::metadata::{generate_metadata, MetadataFilter, MetadataOverrides};
use crate::props::{BfNodeProps, PropsFilter};
use crate::storage::{DbItem, QueryOptions, QueryOutput, StorageAdapter};
use crate::viewer::CurrentViewer;
use log::{debug, info};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct NodeRepository<P: BfNodeProps> {
    storage: Arc<dyn StorageAdapter>,
    viewer: CurrentViewer,
    defaults: QueryOptions,
    _props: PhantomData<fn() -> P>,
}

impl<P: BfNodeProps> Clone for NodeRepository<P> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            viewer: self.viewer.clone(),
            defaults: self.defaults.clone(),
            _props: PhantomData,
        }
    }
}

impl<P: BfNodeProps> NodeRepository<P> {
    pub fn new(storage: Arc<dyn StorageAdapter>, viewer: CurrentViewer) -> Self {
        Self {
            storage,
            viewer,
            defaults: QueryOptions::default(),
            _props: PhantomData,
        }
    }

    /// Options used by [`query`](Self::query) when the caller passes none
    pub fn with_query_defaults(mut self, defaults: QueryOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn viewer(&self) -> &CurrentViewer {
        &self.viewer
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub async fn create(&self, props: P) -> BfDbResult<Arc<BfNode<P>>> {
        self.create_with_metadata(props, MetadataOverrides::new(), None)
            .await
    }

    /// Allocate metadata, persist the node and return it clean.
    ///
    /// The props hooks run around the write. Nothing is returned when the
    /// write fails. With a cache, the new node is registered so later
    /// lookups in the same operation resolve to this instance.
    pub async fn create_with_metadata(
        &self,
        mut props: P,
        overrides: MetadataOverrides,
        cache: Option<&mut BfNodeCache<P>>,
    ) -> BfDbResult<Arc<BfNode<P>>> {
        if let Some(class_name) = &overrides.class_name {
            if class_name != P::CLASS_NAME {
                return Err(BfDbError::ClassMismatch {
                    expected: P::CLASS_NAME.to_string(),
                    found: class_name.clone(),
                });
            }
        }
        let metadata = generate_metadata(&self.viewer, P::CLASS_NAME, overrides)?;
        props.before_create(&metadata)?;
        let node = BfNode::unsaved(Arc::clone(&self.storage), self.viewer.clone(), props, metadata);
        node.persist_new().await?;
        info!("Created {}", node);
        let node = match cache {
            Some(cache) => cache.insert(Arc::new(node)),
            None => Arc::new(node),
        };
        node.props().after_create(&node.metadata())?;
        Ok(node)
    }

    /// Cache-first lookup by id; a missing record is `NodeNotFound`
    pub async fn find_x(
        &self,
        id: &BfGid,
        cache: Option<&mut BfNodeCache<P>>,
    ) -> BfDbResult<Arc<BfNode<P>>> {
        if let Some(cache) = cache {
            if let Some(node) = cache.get(id) {
                debug!("{} cache hit for {}", P::CLASS_NAME, id);
                return Ok(node);
            }
            let node = self.fetch(id).await?;
            return Ok(cache.insert(node));
        }
        self.fetch(id).await
    }

    /// Like [`find_x`](Self::find_x) but absence is `Ok(None)`
    pub async fn find(
        &self,
        id: &BfGid,
        cache: Option<&mut BfNodeCache<P>>,
    ) -> BfDbResult<Option<Arc<BfNode<P>>>> {
        match self.find_x(id, cache).await {
            Ok(node) => Ok(Some(node)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, id: &BfGid) -> BfDbResult<Arc<BfNode<P>>> {
        let item = self
            .storage
            .get(self.viewer.owner_scope(), id)
            .await?
            .ok_or_else(|| BfDbError::NodeNotFound(id.to_string()))?;
        self.materialize(item)
    }

    pub(crate) fn materialize(&self, item: DbItem) -> BfDbResult<Arc<BfNode<P>>> {
        BfNode::from_item(Arc::clone(&self.storage), self.viewer.clone(), item).map(Arc::new)
    }

    /// Pin the filter to this type and, for normal viewers, their organization
    pub(crate) fn scoped_filter(&self, mut filter: MetadataFilter) -> BfDbResult<MetadataFilter> {
        match &filter.class_name {
            Some(class_name) if class_name != P::CLASS_NAME => {
                return Err(BfDbError::ClassMismatch {
                    expected: P::CLASS_NAME.to_string(),
                    found: class_name.clone(),
                });
            }
            _ => filter.class_name = Some(P::CLASS_NAME.to_string()),
        }
        if let Some(org) = self.viewer.owner_scope() {
            filter.bf_oid = Some(org.clone());
        }
        Ok(filter)
    }

    /// Query nodes of this type, ascending by sort value unless `options` say otherwise.
    ///
    /// An empty `ids` slice means no id restriction. Every result goes
    /// through `cache` when one is given, so already cached ids resolve to
    /// their cached instance.
    pub async fn query(
        &self,
        metadata: MetadataFilter,
        props: &PropsFilter,
        ids: &[BfGid],
        cache: Option<&mut BfNodeCache<P>>,
        options: Option<QueryOptions>,
    ) -> BfDbResult<Vec<Arc<BfNode<P>>>> {
        let options = options.unwrap_or_else(|| self.defaults.clone());
        if options.count_only {
            return Err(BfDbError::Precondition(
                "count-only queries go through NodeRepository::count".to_string(),
            ));
        }
        let filter = self.scoped_filter(metadata)?;
        let output = self
            .storage
            .query(
                &filter,
                props,
                ids,
                options.direction(),
                &options.field(),
                &options,
            )
            .await?;
        let QueryOutput::Items(items) = output else {
            return Err(BfDbError::StorageQuery(format!(
                "{} returned a count for an item query",
                self.storage.name()
            )));
        };
        debug!("{} query returned {} rows", P::CLASS_NAME, items.len());

        let mut cache = cache;
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            let node = self.materialize(item)?;
            nodes.push(match cache.as_deref_mut() {
                Some(cache) => cache.insert(node),
                None => node,
            });
        }
        Ok(nodes)
    }

    /// Number of nodes of this type matching the filters
    pub async fn count(
        &self,
        metadata: MetadataFilter,
        props: &PropsFilter,
        ids: &[BfGid],
    ) -> BfDbResult<usize> {
        let filter = self.scoped_filter(metadata)?;
        let options = self.defaults.clone().count_only();
        let output = self
            .storage
            .query(
                &filter,
                props,
                ids,
                options.direction(),
                &options.field(),
                &options,
            )
            .await?;
        Ok(output.len())
    }
}
