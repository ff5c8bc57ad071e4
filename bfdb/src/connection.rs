// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Cursor pagination over node lists
//!
//! Presentation adapter for the API boundary: takes already fetched nodes
//! and shapes them into `edges` + `pageInfo`. Cursors are the hex encoding of
//! a node's sort value, so a cursor stays valid as long as the node exists.

use crate::error::{BfDbError, BfDbResult};
use crate::node::BfNode;
use crate::props::BfNodeProps;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Relay-style pagination arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, first: usize) -> Self {
        self.first = Some(first);
        self
    }

    pub fn last(mut self, last: usize) -> Self {
        self.last = Some(last);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConnectionEdge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<ConnectionEdge<T>>,
    pub page_info: PageInfo,
    /// Size of the list before pagination
    pub count: usize,
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

pub fn encode_cursor(sort_value: i64) -> String {
    hex::encode(sort_value.to_string())
}

/// Sort value behind a cursor; anything else is a malformed argument
pub fn decode_cursor(cursor: &str) -> BfDbResult<i64> {
    let malformed = || BfDbError::StorageQuery(format!("malformed cursor '{}'", cursor));
    let bytes = hex::decode(cursor).map_err(|_| malformed())?;
    let text = String::from_utf8(bytes).map_err(|_| malformed())?;
    text.parse::<i64>().map_err(|_| malformed())
}

/// Page `items` by `args`, ordering them by `sort_value` first
pub fn connection_from_sorted<T, F>(
    mut items: Vec<T>,
    args: &ConnectionArgs,
    sort_value: F,
) -> BfDbResult<Connection<T>>
where
    F: Fn(&T) -> i64,
{
    items.sort_by_key(|item| sort_value(item));
    let count = items.len();

    let mut start = 0;
    let mut end = count;
    if let Some(after) = &args.after {
        let after = decode_cursor(after)?;
        start = items
            .iter()
            .position(|item| sort_value(item) > after)
            .unwrap_or(count);
    }
    if let Some(before) = &args.before {
        let before = decode_cursor(before)?;
        end = items
            .iter()
            .position(|item| sort_value(item) >= before)
            .unwrap_or(count);
    }
    end = end.max(start);
    if let Some(first) = args.first {
        end = end.min(start.saturating_add(first));
    }
    if let Some(last) = args.last {
        start = start.max(end.saturating_sub(last));
    }

    let has_next_page = end < count;
    let has_previous_page = start > 0;
    let edges: Vec<ConnectionEdge<T>> = items
        .into_iter()
        .skip(start)
        .take(end - start)
        .map(|node| ConnectionEdge {
            cursor: encode_cursor(sort_value(&node)),
            node,
        })
        .collect();

    Ok(Connection {
        page_info: PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|edge| edge.cursor.clone()),
            end_cursor: edges.last().map(|edge| edge.cursor.clone()),
        },
        edges,
        count,
    })
}

/// Connection over materialized nodes, ordered by their sort value
pub fn connection_from_nodes<P: BfNodeProps>(
    nodes: Vec<Arc<BfNode<P>>>,
    args: &ConnectionArgs,
) -> BfDbResult<Connection<Arc<BfNode<P>>>> {
    connection_from_sorted(nodes, args, |node| node.sort_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(args: ConnectionArgs) -> (Vec<i64>, PageInfo) {
        let connection = connection_from_sorted(vec![50, 10, 40, 20, 30], &args, |v| *v).unwrap();
        (connection.nodes().copied().collect(), connection.page_info)
    }

    #[test]
    fn test_cursor_round_trip() {
        assert_eq!(decode_cursor(&encode_cursor(1_700_000_000_123)).unwrap(), 1_700_000_000_123);
        assert!(decode_cursor("zz").is_err());
        assert!(decode_cursor(&hex::encode("abc")).is_err());
    }

    #[test]
    fn test_no_args_returns_everything_sorted() {
        let (values, info) = page(ConnectionArgs::new());
        assert_eq!(values, vec![10, 20, 30, 40, 50]);
        assert!(!info.has_next_page);
        assert!(!info.has_previous_page);
        assert_eq!(info.start_cursor, Some(encode_cursor(10)));
        assert_eq!(info.end_cursor, Some(encode_cursor(50)));
    }

    #[test]
    fn test_first_then_after() {
        let (values, info) = page(ConnectionArgs::new().first(2));
        assert_eq!(values, vec![10, 20]);
        assert!(info.has_next_page);

        let after = info.end_cursor.unwrap();
        let (values, info) = page(ConnectionArgs::new().first(2).after(after));
        assert_eq!(values, vec![30, 40]);
        assert!(info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_last_before() {
        let (values, info) = page(ConnectionArgs::new().last(2).before(encode_cursor(40)));
        assert_eq!(values, vec![20, 30]);
        assert!(info.has_next_page);
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_after_last_item_is_empty() {
        let (values, info) = page(ConnectionArgs::new().after(encode_cursor(50)));
        assert!(values.is_empty());
        assert!(info.start_cursor.is_none());
        assert!(info.has_previous_page);
    }

    #[test]
    fn test_unbounded_first_after_cursor() {
        let (values, info) = page(ConnectionArgs::new().first(usize::MAX).after(encode_cursor(10)));
        assert_eq!(values, vec![20, 30, 40, 50]);
        assert!(!info.has_next_page);
        assert!(info.has_previous_page);
    }
}
