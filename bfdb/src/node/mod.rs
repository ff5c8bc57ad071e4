// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Typed graph nodes
//!
//! A [`BfNode<P>`] is one vertex with its metadata and props of type `P`.
//! Instances are shared as `Arc<BfNode<P>>` so that a cache can hand out the
//! same instance for the same id; mutable state sits behind a lock that is
//! never held across a storage call.
//!
//! # Lifecycle
//!
//! ```text
//! Unsaved ──save──▶ Persisted ◀──save/load──┐
//!                      │  └─────────────────┘
//!                    delete
//!                      ▼
//!                   Deleted (terminal)
//! ```
//!
//! Clean/dirty is derived: a persisted node is dirty while its props differ
//! from the last saved snapshot.

pub mod repository;

pub use repository::NodeRepository;

use crate::cache::BfNodeCache;
use crate::connection::{Connection, ConnectionArgs};
use crate::edge::{BfEdge, BfEdgeProps, EdgeRepository, DEFAULT_TRAVERSAL_DEPTH};
use crate::error::{BfDbError, BfDbResult};
use crate::ids::BfGid;
use crate::metadata::{BfMetadata, MetadataOverrides};
use crate::props::{merge_props, props_from_json, props_to_json, BfNodeProps, PropsFilter};
use crate::storage::{DbItem, QueryOptions, StorageAdapter};
use crate::viewer::CurrentViewer;
use log::{debug, info};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifecycle {
    /// Constructed but never written
    Unsaved,
    Persisted,
    Deleted,
}

struct NodeState<P> {
    props: P,
    saved_props: P,
    metadata: BfMetadata,
    lifecycle: NodeLifecycle,
}

impl<P> NodeState<P> {
    fn ensure_live(&self, operation: &str) -> BfDbResult<()> {
        if self.lifecycle == NodeLifecycle::Deleted {
            return Err(BfDbError::Precondition(format!(
                "cannot {} deleted node {}",
                operation, self.metadata.bf_gid
            )));
        }
        Ok(())
    }
}

pub struct BfNode<P: BfNodeProps> {
    storage: Arc<dyn StorageAdapter>,
    viewer: CurrentViewer,
    state: RwLock<NodeState<P>>,
}

/// Split a stored record into typed props and metadata, checking its class
pub(crate) fn decode_item<P: BfNodeProps>(item: DbItem) -> BfDbResult<(P, BfMetadata)> {
    if item.metadata.class_name != P::CLASS_NAME {
        return Err(BfDbError::ClassMismatch {
            expected: P::CLASS_NAME.to_string(),
            found: item.metadata.class_name,
        });
    }
    let props = props_from_json(item.props)?;
    Ok((props, item.metadata))
}

impl<P: BfNodeProps> BfNode<P> {
    pub(crate) fn unsaved(
        storage: Arc<dyn StorageAdapter>,
        viewer: CurrentViewer,
        props: P,
        metadata: BfMetadata,
    ) -> Self {
        Self {
            storage,
            viewer,
            state: RwLock::new(NodeState {
                saved_props: props.clone(),
                props,
                metadata,
                lifecycle: NodeLifecycle::Unsaved,
            }),
        }
    }

    pub(crate) fn from_item(
        storage: Arc<dyn StorageAdapter>,
        viewer: CurrentViewer,
        item: DbItem,
    ) -> BfDbResult<Self> {
        let (props, metadata) = decode_item::<P>(item)?;
        Ok(Self {
            storage,
            viewer,
            state: RwLock::new(NodeState {
                saved_props: props.clone(),
                props,
                metadata,
                lifecycle: NodeLifecycle::Persisted,
            }),
        })
    }

    pub fn id(&self) -> BfGid {
        self.state.read().metadata.bf_gid.clone()
    }

    pub fn metadata(&self) -> BfMetadata {
        self.state.read().metadata.clone()
    }

    pub fn class_name(&self) -> &'static str {
        P::CLASS_NAME
    }

    pub fn sort_value(&self) -> i64 {
        self.state.read().metadata.sort_value
    }

    pub fn viewer(&self) -> &CurrentViewer {
        &self.viewer
    }

    pub fn lifecycle(&self) -> NodeLifecycle {
        self.state.read().lifecycle
    }

    pub fn is_persisted(&self) -> bool {
        self.lifecycle() == NodeLifecycle::Persisted
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle() == NodeLifecycle::Deleted
    }

    /// Current in-memory props, including unsaved changes
    pub fn props(&self) -> P {
        self.state.read().props.clone()
    }

    /// Shallow-merge `partial` into the current props.
    ///
    /// Nothing is written to storage. Fails with `InvalidProps` when the merged
    /// object no longer deserializes into `P`, leaving props untouched.
    pub fn set_props(&self, partial: Map<String, Value>) -> BfDbResult<()> {
        let mut state = self.state.write();
        state.ensure_live("modify")?;
        state.props = merge_props(&state.props, partial)?;
        Ok(())
    }

    /// Mutate props in place through a typed closure
    pub fn update_props<F>(&self, update: F) -> BfDbResult<()>
    where
        F: FnOnce(&mut P),
    {
        let mut state = self.state.write();
        state.ensure_live("modify")?;
        update(&mut state.props);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.props != state.saved_props
    }

    /// Write the initial record without bumping `last_updated`
    pub(crate) async fn persist_new(&self) -> BfDbResult<()> {
        let (props, metadata) = {
            let state = self.state.read();
            (props_to_json(&state.props)?, state.metadata.clone())
        };
        self.storage.put(&props, &metadata).await?;
        let mut state = self.state.write();
        state.lifecycle = NodeLifecycle::Persisted;
        Ok(())
    }

    /// Persist the current props.
    ///
    /// `last_updated` strictly increases. If the write fails the node keeps
    /// its previous timestamp and dirty state.
    pub async fn save(&self) -> BfDbResult<()> {
        let (props, mut metadata) = {
            let state = self.state.read();
            state.ensure_live("save")?;
            (state.props.clone(), state.metadata.clone())
        };
        metadata.last_updated = metadata.next_last_updated();
        let json = props_to_json(&props)?;

        debug!(
            "Saving {}#{} via {}",
            P::CLASS_NAME,
            metadata.bf_gid,
            self.storage.name()
        );
        self.storage.put(&json, &metadata).await?;

        let mut state = self.state.write();
        state.metadata.last_updated = metadata.last_updated;
        state.saved_props = props;
        state.lifecycle = NodeLifecycle::Persisted;
        Ok(())
    }

    /// Replace in-memory state with the persisted record, discarding local changes
    pub async fn load(&self) -> BfDbResult<()> {
        let id = {
            let state = self.state.read();
            state.ensure_live("load")?;
            state.metadata.bf_gid.clone()
        };
        let item = self
            .storage
            .get(self.viewer.owner_scope(), &id)
            .await?
            .ok_or_else(|| BfDbError::NodeNotFound(id.to_string()))?;
        let (props, metadata) = decode_item::<P>(item)?;

        let mut state = self.state.write();
        state.props = props.clone();
        state.saved_props = props;
        state.metadata = metadata;
        state.lifecycle = NodeLifecycle::Persisted;
        Ok(())
    }

    /// Remove the record along with every edge touching it.
    ///
    /// Edges go first: an interrupted delete leaves the node in place with
    /// fewer edges, never edges pointing at a missing node. A record the
    /// viewer does not own is a `Precondition` error and nothing is touched.
    /// Returns false when the record was already gone.
    pub async fn delete(&self) -> BfDbResult<bool> {
        let metadata = {
            let state = self.state.read();
            state.ensure_live("delete")?;
            state.metadata.clone()
        };
        let owner = self.viewer.owner_scope();
        self.ensure_not_foreign(owner, &metadata.bf_gid).await?;

        if !metadata.is_edge() {
            let removed = self
                .edges()
                .delete_edges_touching_node(&metadata.bf_gid)
                .await?;
            debug!(
                "Cascade removed {} edges of {}#{}",
                removed,
                P::CLASS_NAME,
                metadata.bf_gid
            );
        }

        let deleted = self.storage.delete(owner, &metadata.bf_gid).await?;
        if !deleted {
            self.ensure_not_foreign(owner, &metadata.bf_gid).await?;
        }
        self.state.write().lifecycle = NodeLifecycle::Deleted;
        info!("Deleted {}#{} ({})", P::CLASS_NAME, metadata.bf_gid, deleted);
        Ok(deleted)
    }

    /// Fail when the record exists but is outside the viewer's organization
    async fn ensure_not_foreign(&self, owner: Option<&BfGid>, id: &BfGid) -> BfDbResult<()> {
        let Some(owner) = owner else {
            return Ok(());
        };
        if self.storage.get(Some(owner), id).await?.is_some() {
            return Ok(());
        }
        match self.storage.get(None, id).await? {
            Some(item) => Err(BfDbError::Precondition(format!(
                "{}#{} belongs to organization {}, not {}",
                P::CLASS_NAME,
                id,
                item.metadata.bf_oid,
                owner
            ))),
            None => Ok(()),
        }
    }

    /// Edge repository acting as this node's viewer
    pub fn edges(&self) -> EdgeRepository {
        EdgeRepository::new(Arc::clone(&self.storage), self.viewer.clone())
    }

    fn live_id(&self, operation: &str) -> BfDbResult<BfGid> {
        let state = self.state.read();
        state.ensure_live(operation)?;
        Ok(state.metadata.bf_gid.clone())
    }

    /// Nodes of type `T` this node points at through edges matching `edge_filter`
    pub async fn query_targets<T: BfNodeProps>(
        &self,
        props_filter: &PropsFilter,
        edge_filter: &PropsFilter,
        cache: Option<&mut BfNodeCache<T>>,
        options: Option<QueryOptions>,
    ) -> BfDbResult<Vec<Arc<BfNode<T>>>> {
        let id = self.live_id("traverse from")?;
        self.edges()
            .query_target_instances(&id, props_filter, edge_filter, cache, options)
            .await
    }

    /// Nodes of type `S` pointing at this node through edges matching `edge_filter`
    pub async fn query_sources<S: BfNodeProps>(
        &self,
        props_filter: &PropsFilter,
        edge_filter: &PropsFilter,
        cache: Option<&mut BfNodeCache<S>>,
        options: Option<QueryOptions>,
    ) -> BfDbResult<Vec<Arc<BfNode<S>>>> {
        let id = self.live_id("traverse from")?;
        self.edges()
            .query_source_instances(&id, props_filter, edge_filter, cache, options)
            .await
    }

    /// Create a node of type `T` and an edge from this node to it
    pub async fn create_target_node<T: BfNodeProps>(
        &self,
        props: T,
        role: &str,
        overrides: MetadataOverrides,
    ) -> BfDbResult<(Arc<BfNode<T>>, Arc<BfEdge>)> {
        self.live_id("attach to")?;
        let target = NodeRepository::<T>::new(Arc::clone(&self.storage), self.viewer.clone())
            .create_with_metadata(props, overrides, None)
            .await?;
        let edge = self
            .edges()
            .create_between_nodes_with_props(self, target.as_ref(), BfEdgeProps::new(role))
            .await?;
        Ok((target, edge))
    }

    pub async fn query_targets_connection_for_graphql<T: BfNodeProps>(
        &self,
        props_filter: &PropsFilter,
        args: &ConnectionArgs,
        edge_filter: &PropsFilter,
    ) -> BfDbResult<Connection<Arc<BfNode<T>>>> {
        let id = self.live_id("traverse from")?;
        self.edges()
            .query_targets_connection_for_graphql(&id, props_filter, args, edge_filter)
            .await
    }

    /// Nodes of type `T` reachable along outgoing edges within `depth` hops
    pub async fn query_descendants_by_class<T: BfNodeProps>(
        &self,
        depth: Option<usize>,
        cache: Option<&mut BfNodeCache<T>>,
    ) -> BfDbResult<Vec<Arc<BfNode<T>>>> {
        let id = self.live_id("traverse from")?;
        self.edges()
            .query_descendants_by_class(&id, depth.unwrap_or(DEFAULT_TRAVERSAL_DEPTH), cache)
            .await
    }

    /// Nodes of type `S` reaching this node along edges within `depth` hops
    pub async fn query_ancestors_by_class<S: BfNodeProps>(
        &self,
        depth: Option<usize>,
        cache: Option<&mut BfNodeCache<S>>,
    ) -> BfDbResult<Vec<Arc<BfNode<S>>>> {
        let id = self.live_id("traverse from")?;
        self.edges()
            .query_ancestors_by_class(&id, depth.unwrap_or(DEFAULT_TRAVERSAL_DEPTH), cache)
            .await
    }
}

impl<P: BfNodeProps> fmt::Debug for BfNode<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("BfNode")
            .field("class_name", &P::CLASS_NAME)
            .field("bf_gid", &state.metadata.bf_gid)
            .field("lifecycle", &state.lifecycle)
            .field("props", &state.props)
            .finish()
    }
}

impl<P: BfNodeProps> fmt::Display for BfNode<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", P::CLASS_NAME, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::generate_metadata;
    use crate::storage::InMemoryAdapter;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        body: String,
        #[serde(default)]
        pinned: bool,
    }

    impl BfNodeProps for Note {
        const CLASS_NAME: &'static str = "Note";
    }

    fn note(storage: Arc<dyn StorageAdapter>) -> BfNode<Note> {
        let viewer = CurrentViewer::new("org", "person");
        let metadata =
            generate_metadata(&viewer, Note::CLASS_NAME, MetadataOverrides::new()).unwrap();
        BfNode::unsaved(
            storage,
            viewer,
            Note {
                body: "draft".to_string(),
                pinned: false,
            },
            metadata,
        )
    }

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_props_merges_and_marks_dirty() {
        let node = note(Arc::new(InMemoryAdapter::new()));
        node.persist_new().await.unwrap();
        assert!(!node.is_dirty());

        node.set_props(patch(json!({"pinned": true}))).unwrap();
        assert!(node.is_dirty());
        assert_eq!(node.props().body, "draft");

        // Setting the saved value back is not a change
        node.set_props(patch(json!({"pinned": false}))).unwrap();
        assert!(!node.is_dirty());
    }

    #[tokio::test]
    async fn test_invalid_merge_leaves_props_untouched() {
        let node = note(Arc::new(InMemoryAdapter::new()));
        let result = node.set_props(patch(json!({"pinned": "yes"})));
        assert!(matches!(result, Err(BfDbError::InvalidProps(_))));
        assert!(!node.props().pinned);
    }

    #[tokio::test]
    async fn test_load_discards_local_changes() {
        let node = note(Arc::new(InMemoryAdapter::new()));
        node.persist_new().await.unwrap();
        node.update_props(|props| props.body = "edited".to_string())
            .unwrap();
        assert!(node.is_dirty());

        node.load().await.unwrap();
        assert_eq!(node.props().body, "draft");
        assert!(!node.is_dirty());
    }

    #[tokio::test]
    async fn test_load_of_unsaved_node_is_not_found() {
        let node = note(Arc::new(InMemoryAdapter::new()));
        assert!(node.load().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_deleted_node_rejects_operations() {
        let node = note(Arc::new(InMemoryAdapter::new()));
        node.persist_new().await.unwrap();
        assert!(node.delete().await.unwrap());
        assert!(node.is_deleted());

        assert!(matches!(node.save().await, Err(BfDbError::Precondition(_))));
        assert!(matches!(node.load().await, Err(BfDbError::Precondition(_))));
        assert!(matches!(node.delete().await, Err(BfDbError::Precondition(_))));
        assert!(matches!(
            node.update_props(|props| props.pinned = true),
            Err(BfDbError::Precondition(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_classes() {
        let viewer = CurrentViewer::new("org", "person");
        let metadata = generate_metadata(&viewer, "Other", MetadataOverrides::new()).unwrap();
        let item = DbItem {
            props: json!({"body": "x"}),
            metadata,
        };
        match decode_item::<Note>(item) {
            Err(BfDbError::ClassMismatch { expected, found }) => {
                assert_eq!(expected, "Note");
                assert_eq!(found, "Other");
            }
            other => panic!("expected class mismatch, got {:?}", other),
        }
    }
}
