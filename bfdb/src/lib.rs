// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! bfdb - typed node/edge persistence over pluggable storage
//!
//! bfdb models an application graph as typed nodes connected by directed,
//! role-labeled edges, stored through an async [`StorageAdapter`].
//!
//! # Features
//!
//! - **Typed nodes**: `BfNode<P>` for any serde props type `P`
//! - **Dirty tracking**: shallow-merge updates, explicit save/load
//! - **Edge traversal**: targets, sources, ancestors and descendants by class
//! - **Request caches**: at most one fetch per id within an operation
//! - **Backends**: in-memory maps, or a key/value tree on sled
//!
//! # Usage
//!
//! ```ignore
//! let db = BfDb::open(&BfDbConfig::from_env()?)?;
//! let viewer = CurrentViewer::new(org_id, person_id);
//!
//! let org = db.nodes::<Org>(&viewer).create(Org { name: "Acme".into() }).await?;
//! let person = db.nodes::<Person>(&viewer).create(person_props).await?;
//! db.edges(&viewer).create_between_nodes(&person, &org, "memberOf").await?;
//!
//! let orgs = person
//!     .query_targets::<Org>(&PropsFilter::new(), &PropsFilter::role("memberOf"), None, None)
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod db;
pub mod edge;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod node;
pub mod props;
pub mod storage;
pub mod viewer;

pub use cache::{BfNodeCache, CacheStats};
pub use config::{init_logging, BfDbConfig, QueryDefaults, StorageBackend, StorageConfig};
pub use connection::{Connection, ConnectionArgs, ConnectionEdge, PageInfo};
pub use db::BfDb;
pub use edge::{BfEdge, BfEdgeProps, EdgeRepository, DEFAULT_TRAVERSAL_DEPTH};
pub use error::{BfDbError, BfDbResult};
pub use ids::BfGid;
pub use metadata::{BfMetadata, EdgeEndpoints, MetadataFilter, MetadataOverrides};
pub use node::{BfNode, NodeLifecycle, NodeRepository};
pub use props::{BfNodeProps, PropsFilter};
pub use storage::{
    CursorValue, DbItem, InMemoryAdapter, KvStorageAdapter, QueryOptions, QueryOutput,
    SortDirection, SortField, StorageAdapter,
};
pub use viewer::{CurrentViewer, ViewerPrivilege};

/// bfdb version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// bfdb crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
