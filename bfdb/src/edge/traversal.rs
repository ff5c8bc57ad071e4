// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Breadth-first reachability over edges

use super::{BfEdge, EdgeRepository};
use crate::cache::BfNodeCache;
use crate::error::BfDbResult;
use crate::ids::BfGid;
use crate::metadata::{EdgeEndpoints, MetadataFilter};
use crate::node::BfNode;
use crate::props::{BfNodeProps, PropsFilter};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Hop limit used when the caller gives none
pub const DEFAULT_TRAVERSAL_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Follow edges from source to target
    Down,
    /// Follow edges from target to source
    Up,
}

impl Direction {
    fn filter(self, id: &BfGid) -> MetadataFilter {
        match self {
            Direction::Down => MetadataFilter::new().bf_sid(id.clone()),
            Direction::Up => MetadataFilter::new().bf_tid(id.clone()),
        }
    }

    /// The far end of an edge and its class name
    fn far_end(self, endpoints: EdgeEndpoints) -> (BfGid, String) {
        match self {
            Direction::Down => (endpoints.bf_tid, endpoints.bf_t_class_name),
            Direction::Up => (endpoints.bf_sid, endpoints.bf_s_class_name),
        }
    }
}

impl EdgeRepository {
    /// Nodes of type `T` reachable from `source_id` within `depth` hops.
    ///
    /// The walk passes through nodes of any class and visits each node once.
    /// Results come back in discovery order.
    pub async fn query_descendants_by_class<T: BfNodeProps>(
        &self,
        source_id: &BfGid,
        depth: usize,
        cache: Option<&mut BfNodeCache<T>>,
    ) -> BfDbResult<Vec<Arc<BfNode<T>>>> {
        self.walk(source_id, depth, Direction::Down, cache).await
    }

    /// Nodes of type `S` that reach `target_id` within `depth` hops
    pub async fn query_ancestors_by_class<S: BfNodeProps>(
        &self,
        target_id: &BfGid,
        depth: usize,
        cache: Option<&mut BfNodeCache<S>>,
    ) -> BfDbResult<Vec<Arc<BfNode<S>>>> {
        self.walk(target_id, depth, Direction::Up, cache).await
    }

    async fn walk<P: BfNodeProps>(
        &self,
        start: &BfGid,
        depth: usize,
        direction: Direction,
        cache: Option<&mut BfNodeCache<P>>,
    ) -> BfDbResult<Vec<Arc<BfNode<P>>>> {
        let mut visited: HashSet<BfGid> = HashSet::from([start.clone()]);
        let mut frontier = vec![start.clone()];
        let mut matches: Vec<BfGid> = Vec::new();

        for level in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for id in &frontier {
                let edges: Vec<Arc<BfEdge>> = self
                    .query_edges(direction.filter(id), &PropsFilter::new())
                    .await?;
                for endpoints in edges.iter().filter_map(|edge| edge.endpoints()) {
                    let (far_id, far_class) = direction.far_end(endpoints);
                    if !visited.insert(far_id.clone()) {
                        continue;
                    }
                    if far_class == P::CLASS_NAME {
                        matches.push(far_id.clone());
                    }
                    next.push(far_id);
                }
            }
            debug!(
                "{:?} walk from {} level {}: {} new nodes",
                direction,
                start,
                level + 1,
                next.len()
            );
            frontier = next;
        }

        if matches.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .nodes::<P>()
            .query(MetadataFilter::new(), &PropsFilter::new(), &matches, cache, None)
            .await?;

        let order: HashMap<&BfGid, usize> = matches
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        let mut found: Vec<(usize, Arc<BfNode<P>>)> = found
            .into_iter()
            .map(|node| (order.get(&node.id()).copied().unwrap_or(usize::MAX), node))
            .collect();
        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, node)| node).collect())
    }
}
