// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Directed, role-labeled edges between nodes
//!
//! An edge is an ordinary node of class `BfEdge` whose metadata also carries
//! its endpoints. Traversal is two-phase: find the matching edges, then fetch
//! the nodes on the other end by id.

mod traversal;

pub use traversal::DEFAULT_TRAVERSAL_DEPTH;

use crate::cache::BfNodeCache;
use crate::connection::{connection_from_nodes, Connection, ConnectionArgs};
use crate::error::{BfDbError, BfDbResult};
use crate::ids::BfGid;
use crate::metadata::{EdgeEndpoints, MetadataFilter, MetadataOverrides};
use crate::node::{BfNode, NodeLifecycle, NodeRepository};
use crate::props::{BfNodeProps, PropsFilter};
use crate::storage::{QueryOptions, QueryOutput, StorageAdapter};
use crate::viewer::CurrentViewer;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Props of an edge: its role plus any extra edge attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BfEdgeProps {
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BfEdgeProps {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl BfNodeProps for BfEdgeProps {
    const CLASS_NAME: &'static str = "BfEdge";
}

pub type BfEdge = BfNode<BfEdgeProps>;

impl BfNode<BfEdgeProps> {
    pub fn role(&self) -> String {
        self.props().role
    }

    pub fn endpoints(&self) -> Option<EdgeEndpoints> {
        self.metadata().edge
    }

    pub fn source_id(&self) -> Option<BfGid> {
        self.endpoints().map(|edge| edge.bf_sid)
    }

    pub fn target_id(&self) -> Option<BfGid> {
        self.endpoints().map(|edge| edge.bf_tid)
    }
}

/// Edge operations on behalf of one viewer
#[derive(Clone)]
pub struct EdgeRepository {
    edges: NodeRepository<BfEdgeProps>,
}

impl EdgeRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>, viewer: CurrentViewer) -> Self {
        Self {
            edges: NodeRepository::new(storage, viewer),
        }
    }

    pub fn viewer(&self) -> &CurrentViewer {
        self.edges.viewer()
    }

    fn storage(&self) -> &Arc<dyn StorageAdapter> {
        self.edges.storage()
    }

    fn nodes<P: BfNodeProps>(&self) -> NodeRepository<P> {
        NodeRepository::new(Arc::clone(self.storage()), self.viewer().clone())
    }

    /// Fail unless `node` is a live, persisted instance that storage still holds
    async fn ensure_endpoint<P: BfNodeProps>(&self, node: &BfNode<P>, end: &str) -> BfDbResult<()> {
        match node.lifecycle() {
            NodeLifecycle::Persisted => {}
            NodeLifecycle::Unsaved => {
                return Err(BfDbError::Precondition(format!(
                    "edge {} {} has not been saved",
                    end, node
                )))
            }
            NodeLifecycle::Deleted => {
                return Err(BfDbError::Precondition(format!(
                    "edge {} {} has been deleted",
                    end, node
                )))
            }
        }
        let id = node.id();
        match self.storage().get(self.viewer().owner_scope(), &id).await? {
            Some(_) => Ok(()),
            None => Err(BfDbError::NodeNotFound(id.to_string())),
        }
    }

    pub async fn create_between_nodes<S: BfNodeProps, T: BfNodeProps>(
        &self,
        source: &BfNode<S>,
        target: &BfNode<T>,
        role: &str,
    ) -> BfDbResult<Arc<BfEdge>> {
        self.create_between_nodes_with_props(source, target, BfEdgeProps::new(role))
            .await
    }

    pub async fn create_between_nodes_with_props<S: BfNodeProps, T: BfNodeProps>(
        &self,
        source: &BfNode<S>,
        target: &BfNode<T>,
        props: BfEdgeProps,
    ) -> BfDbResult<Arc<BfEdge>> {
        self.ensure_endpoint(source, "source").await?;
        self.ensure_endpoint(target, "target").await?;

        let endpoints = EdgeEndpoints {
            bf_sid: source.id(),
            bf_s_class_name: S::CLASS_NAME.to_string(),
            bf_tid: target.id(),
            bf_t_class_name: T::CLASS_NAME.to_string(),
        };
        let role = props.role.clone();
        let edge = self
            .edges
            .create_with_metadata(props, MetadataOverrides::new().with_edge(endpoints), None)
            .await?;
        info!("Linked {} --{}--> {}", source, role, target);
        Ok(edge)
    }

    /// Edges matching `metadata` and `edge_filter`, ascending by sort value
    pub async fn query_edges(
        &self,
        metadata: MetadataFilter,
        edge_filter: &PropsFilter,
    ) -> BfDbResult<Vec<Arc<BfEdge>>> {
        self.edges
            .query(metadata, edge_filter, &[], None, None)
            .await
    }

    /// Edges pointing at `node`
    pub async fn query_source_edges_for_node<P: BfNodeProps>(
        &self,
        node: &BfNode<P>,
    ) -> BfDbResult<Vec<Arc<BfEdge>>> {
        self.query_edges(MetadataFilter::new().bf_tid(node.id()), &PropsFilter::new())
            .await
    }

    /// Edges leaving `node`
    pub async fn query_target_edges_for_node<P: BfNodeProps>(
        &self,
        node: &BfNode<P>,
    ) -> BfDbResult<Vec<Arc<BfEdge>>> {
        self.query_edges(MetadataFilter::new().bf_sid(node.id()), &PropsFilter::new())
            .await
    }

    /// Nodes of type `T` that `source_id` points at through matching edges.
    ///
    /// No matching edge is an empty result, not an error.
    pub async fn query_target_instances<T: BfNodeProps>(
        &self,
        source_id: &BfGid,
        props_filter: &PropsFilter,
        edge_filter: &PropsFilter,
        cache: Option<&mut BfNodeCache<T>>,
        options: Option<QueryOptions>,
    ) -> BfDbResult<Vec<Arc<BfNode<T>>>> {
        let edges = self
            .query_edges(
                MetadataFilter::new()
                    .bf_sid(source_id.clone())
                    .bf_t_class_name(T::CLASS_NAME),
                edge_filter,
            )
            .await?;
        let target_ids = distinct_ids(edges.iter().filter_map(|edge| edge.target_id()));
        debug!(
            "{} links to {} distinct {} nodes",
            source_id,
            target_ids.len(),
            T::CLASS_NAME
        );
        // An empty id list would mean "no id restriction"
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.nodes::<T>()
            .query(MetadataFilter::new(), props_filter, &target_ids, cache, options)
            .await
    }

    /// Nodes of type `S` pointing at `target_id` through matching edges
    pub async fn query_source_instances<S: BfNodeProps>(
        &self,
        target_id: &BfGid,
        props_filter: &PropsFilter,
        edge_filter: &PropsFilter,
        cache: Option<&mut BfNodeCache<S>>,
        options: Option<QueryOptions>,
    ) -> BfDbResult<Vec<Arc<BfNode<S>>>> {
        let edges = self
            .query_edges(
                MetadataFilter::new()
                    .bf_tid(target_id.clone())
                    .bf_s_class_name(S::CLASS_NAME),
                edge_filter,
            )
            .await?;
        let source_ids = distinct_ids(edges.iter().filter_map(|edge| edge.source_id()));
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.nodes::<S>()
            .query(MetadataFilter::new(), props_filter, &source_ids, cache, options)
            .await
    }

    pub async fn query_targets_connection_for_graphql<T: BfNodeProps>(
        &self,
        source_id: &BfGid,
        props_filter: &PropsFilter,
        args: &ConnectionArgs,
        edge_filter: &PropsFilter,
    ) -> BfDbResult<Connection<Arc<BfNode<T>>>> {
        let targets = self
            .query_target_instances::<T>(source_id, props_filter, edge_filter, None, None)
            .await?;
        connection_from_nodes(targets, args)
    }

    /// Delete every edge where `node_id` is the source or the target.
    ///
    /// Runs unscoped so edges written by other organizations go too.
    /// Returns the number of edges removed.
    pub async fn delete_edges_touching_node(&self, node_id: &BfGid) -> BfDbResult<usize> {
        let storage = self.storage();
        let options = QueryOptions::default();
        let mut edge_ids = BTreeSet::new();
        for filter in [
            MetadataFilter::new()
                .class_name(BfEdgeProps::CLASS_NAME)
                .bf_sid(node_id.clone()),
            MetadataFilter::new()
                .class_name(BfEdgeProps::CLASS_NAME)
                .bf_tid(node_id.clone()),
        ] {
            let output = storage
                .query(
                    &filter,
                    &PropsFilter::new(),
                    &[],
                    options.direction(),
                    &options.field(),
                    &options,
                )
                .await?;
            let QueryOutput::Items(items) = output else {
                return Err(BfDbError::StorageQuery(format!(
                    "{} returned a count for the edges of {}",
                    storage.name(),
                    node_id
                )));
            };
            edge_ids.extend(items.into_iter().map(|item| item.metadata.bf_gid));
        }

        let mut removed = 0;
        for edge_id in &edge_ids {
            if storage.delete(None, edge_id).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Removed {} edges touching {}", removed, node_id);
        }
        Ok(removed)
    }
}

/// Non-empty ids in first-seen order, each once
fn distinct_ids(ids: impl Iterator<Item = BfGid>) -> Vec<BfGid> {
    let mut seen = BTreeSet::new();
    ids.filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}
