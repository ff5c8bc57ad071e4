// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Query options and the in-process query executor
//!
//! Adapters that cannot push a query down into an engine (the in-memory map
//! and the key/value tree) filter rows themselves and then hand the
//! survivors to [`execute_query`], which applies ordering, cursors, batching
//! and limits with the same semantics a SQL backend would.

use super::{DbItem, QueryOutput};
use crate::error::BfDbResult;
use crate::ids::BfGid;
use crate::metadata::MetadataFilter;
use crate::props::PropsFilter;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Default read unit for batched queries
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Default ceiling for size-limited queries (10 MiB)
pub const DEFAULT_MAX_SIZE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Field rows are ordered by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortField {
    #[default]
    SortValue,
    CreatedAt,
    LastUpdated,
    ClassName,
    BfGid,
    /// A top-level prop
    Prop(String),
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::SortValue => write!(f, "sort_value"),
            SortField::CreatedAt => write!(f, "created_at"),
            SortField::LastUpdated => write!(f, "last_updated"),
            SortField::ClassName => write!(f, "class_name"),
            SortField::BfGid => write!(f, "bf_gid"),
            SortField::Prop(name) => write!(f, "props.{}", name),
        }
    }
}

/// Resume position for iteration; rows strictly past it are returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CursorValue {
    Number(i64),
    Text(String),
}

impl From<i64> for CursorValue {
    fn from(value: i64) -> Self {
        CursorValue::Number(value)
    }
}

impl From<&str> for CursorValue {
    fn from(value: &str) -> Self {
        CursorValue::Text(value.to_string())
    }
}

impl From<String> for CursorValue {
    fn from(value: String) -> Self {
        CursorValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub use_size_limit: bool,
    pub cursor_value: Option<CursorValue>,
    pub max_size_bytes: usize,
    pub batch_size: usize,
    pub total_limit: Option<usize>,
    pub count_only: bool,
    /// Overrides the default ascending order
    pub sort_direction: Option<SortDirection>,
    /// Overrides the default `sort_value` field
    pub sort_field: Option<SortField>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_size_limit: false,
            cursor_value: None,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            batch_size: DEFAULT_BATCH_SIZE,
            total_limit: None,
            count_only: false,
            sort_direction: None,
            sort_field: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total_limit(mut self, limit: usize) -> Self {
        self.total_limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<CursorValue>) -> Self {
        self.cursor_value = Some(cursor.into());
        self
    }

    pub fn with_size_limit(mut self, max_size_bytes: usize) -> Self {
        self.use_size_limit = true;
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn count_only(mut self) -> Self {
        self.count_only = true;
        self
    }

    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_field = Some(field);
        self.sort_direction = Some(direction);
        self
    }

    pub fn direction(&self) -> SortDirection {
        self.sort_direction.unwrap_or_default()
    }

    pub fn field(&self) -> SortField {
        self.sort_field.clone().unwrap_or_default()
    }
}

/// Comparable projection of a row's sort field
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Int(_) | SortKey::Float(_) => 1,
            SortKey::Text(_) => 2,
        }
    }

    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Int(a), SortKey::Float(b)) => (*a as f64).total_cmp(b),
            (SortKey::Float(a), SortKey::Int(b)) => a.total_cmp(&(*b as f64)),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn of(item: &DbItem, field: &SortField) -> SortKey {
        let metadata = &item.metadata;
        match field {
            SortField::SortValue => SortKey::Int(metadata.sort_value),
            SortField::CreatedAt => SortKey::Int(metadata.created_at.timestamp_micros()),
            SortField::LastUpdated => SortKey::Int(metadata.last_updated.timestamp_micros()),
            SortField::ClassName => SortKey::Text(metadata.class_name.clone()),
            SortField::BfGid => SortKey::Text(metadata.bf_gid.to_string()),
            SortField::Prop(name) => match item.props.get(name) {
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(i) => SortKey::Int(i),
                    None => n.as_f64().map_or(SortKey::Missing, SortKey::Float),
                },
                Some(Value::String(s)) => SortKey::Text(s.clone()),
                Some(Value::Bool(b)) => SortKey::Int(i64::from(*b)),
                _ => SortKey::Missing,
            },
        }
    }
}

impl From<&CursorValue> for SortKey {
    fn from(cursor: &CursorValue) -> Self {
        match cursor {
            CursorValue::Number(n) => SortKey::Int(*n),
            CursorValue::Text(s) => SortKey::Text(s.clone()),
        }
    }
}

/// Row predicate shared by the in-process adapters
pub(crate) fn row_matches(
    item: &DbItem,
    metadata: &MetadataFilter,
    props: &PropsFilter,
    ids: &[BfGid],
) -> bool {
    (ids.is_empty() || ids.contains(&item.metadata.bf_gid))
        && metadata.matches(&item.metadata)
        && props.matches(&item.props)
}

/// Order, page and limit already-filtered rows
pub(crate) fn execute_query(
    mut rows: Vec<DbItem>,
    direction: SortDirection,
    field: &SortField,
    options: &QueryOptions,
) -> BfDbResult<QueryOutput> {
    if options.count_only {
        return Ok(QueryOutput::Count(rows.len()));
    }

    rows.sort_by(|a, b| {
        SortKey::of(a, field)
            .compare(&SortKey::of(b, field))
            .then_with(|| a.metadata.bf_gid.cmp(&b.metadata.bf_gid))
    });
    if direction == SortDirection::Desc {
        rows.reverse();
    }

    if let Some(cursor) = &options.cursor_value {
        let cursor = SortKey::from(cursor);
        rows.retain(|item| {
            let ordering = SortKey::of(item, field).compare(&cursor);
            match direction {
                SortDirection::Asc => ordering == Ordering::Greater,
                SortDirection::Desc => ordering == Ordering::Less,
            }
        });
    }

    let batch_size = options.batch_size.max(1);
    let mut results = Vec::new();
    let mut total_size = 0usize;

    'batches: for (batch_index, batch) in rows.chunks(batch_size).enumerate() {
        debug!(
            "query batch {} ({} rows, {} collected)",
            batch_index,
            batch.len(),
            results.len()
        );
        for item in batch {
            if let Some(limit) = options.total_limit {
                if results.len() >= limit {
                    break 'batches;
                }
            }
            if options.use_size_limit {
                let item_size = serde_json::to_vec(item)?.len();
                if total_size + item_size > options.max_size_bytes {
                    break 'batches;
                }
                total_size += item_size;
            }
            results.push(item.clone());
        }
    }

    Ok(QueryOutput::Items(results))
}
