// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Node identity and metadata generation
//!
//! Every node and edge carries the same metadata shape. Edges additionally
//! record their endpoints so traversal can filter by target type without
//! dereferencing targets.

use crate::error::BfDbResult;
use crate::ids::BfGid;
use crate::viewer::CurrentViewer;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Endpoints of an edge record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEndpoints {
    pub bf_sid: BfGid,
    pub bf_s_class_name: String,
    pub bf_tid: BfGid,
    pub bf_t_class_name: String,
}

/// Metadata stored alongside every node's props
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BfMetadata {
    pub bf_gid: BfGid,
    pub bf_oid: BfGid,
    pub bf_cid: BfGid,
    pub class_name: String,
    pub sort_value: i64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeEndpoints>,
}

impl BfMetadata {
    pub fn is_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// Timestamp for the next successful save; strictly later than the current one
    pub(crate) fn next_last_updated(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let floor = self.last_updated + Duration::microseconds(1);
        if now > floor {
            now
        } else {
            floor
        }
    }
}

/// Caller-supplied replacements for generated metadata.
///
/// There is no `bf_gid` override; ids are allocated once at generation.
#[derive(Debug, Clone, Default)]
pub struct MetadataOverrides {
    pub bf_oid: Option<BfGid>,
    pub bf_cid: Option<BfGid>,
    pub class_name: Option<String>,
    pub sort_value: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub edge: Option<EdgeEndpoints>,
}

impl MetadataOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bf_oid(mut self, bf_oid: impl Into<BfGid>) -> Self {
        self.bf_oid = Some(bf_oid.into());
        self
    }

    pub fn with_bf_cid(mut self, bf_cid: impl Into<BfGid>) -> Self {
        self.bf_cid = Some(bf_cid.into());
        self
    }

    pub fn with_sort_value(mut self, sort_value: i64) -> Self {
        self.sort_value = Some(sort_value);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_edge(mut self, edge: EdgeEndpoints) -> Self {
        self.edge = Some(edge);
        self
    }
}

static LAST_SORT_VALUE: AtomicI64 = AtomicI64::new(0);

/// Next sort value for this process.
///
/// Wall clock milliseconds, bumped past the previous value when the clock has
/// not advanced, so nodes created in sequence sort in creation order.
pub fn generate_sort_value() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_SORT_VALUE.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_SORT_VALUE.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Build fresh metadata for a node of `class_name` created by `viewer`.
///
/// Overrides are applied last and win over generated defaults.
pub fn generate_metadata(
    viewer: &CurrentViewer,
    class_name: &str,
    overrides: MetadataOverrides,
) -> BfDbResult<BfMetadata> {
    viewer.validate()?;

    let now = Utc::now();
    let MetadataOverrides {
        bf_oid,
        bf_cid,
        class_name: class_override,
        sort_value,
        created_at,
        last_updated,
        edge,
    } = overrides;

    let created_at = created_at.unwrap_or(now);
    Ok(BfMetadata {
        bf_gid: BfGid::generate(),
        bf_oid: bf_oid.unwrap_or_else(|| viewer.org_bf_oid.clone()),
        bf_cid: bf_cid.unwrap_or_else(|| viewer.person_bf_gid.clone()),
        class_name: class_override.unwrap_or_else(|| class_name.to_string()),
        sort_value: sort_value.unwrap_or_else(generate_sort_value),
        created_at,
        last_updated: last_updated.unwrap_or(created_at),
        edge,
    })
}

/// Equality filter over metadata columns; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub bf_gid: Option<BfGid>,
    pub bf_oid: Option<BfGid>,
    pub bf_cid: Option<BfGid>,
    pub class_name: Option<String>,
    pub bf_sid: Option<BfGid>,
    pub bf_s_class_name: Option<String>,
    pub bf_tid: Option<BfGid>,
    pub bf_t_class_name: Option<String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bf_gid(mut self, value: impl Into<BfGid>) -> Self {
        self.bf_gid = Some(value.into());
        self
    }

    pub fn bf_oid(mut self, value: impl Into<BfGid>) -> Self {
        self.bf_oid = Some(value.into());
        self
    }

    pub fn bf_cid(mut self, value: impl Into<BfGid>) -> Self {
        self.bf_cid = Some(value.into());
        self
    }

    pub fn class_name(mut self, value: impl Into<String>) -> Self {
        self.class_name = Some(value.into());
        self
    }

    pub fn bf_sid(mut self, value: impl Into<BfGid>) -> Self {
        self.bf_sid = Some(value.into());
        self
    }

    pub fn bf_s_class_name(mut self, value: impl Into<String>) -> Self {
        self.bf_s_class_name = Some(value.into());
        self
    }

    pub fn bf_tid(mut self, value: impl Into<BfGid>) -> Self {
        self.bf_tid = Some(value.into());
        self
    }

    pub fn bf_t_class_name(mut self, value: impl Into<String>) -> Self {
        self.bf_t_class_name = Some(value.into());
        self
    }

    fn has_edge_conditions(&self) -> bool {
        self.bf_sid.is_some()
            || self.bf_s_class_name.is_some()
            || self.bf_tid.is_some()
            || self.bf_t_class_name.is_some()
    }

    pub fn matches(&self, metadata: &BfMetadata) -> bool {
        fn eq<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
            filter.as_ref().map_or(true, |expected| expected == value)
        }

        if !(eq(&self.bf_gid, &metadata.bf_gid)
            && eq(&self.bf_oid, &metadata.bf_oid)
            && eq(&self.bf_cid, &metadata.bf_cid)
            && eq(&self.class_name, &metadata.class_name))
        {
            return false;
        }

        if !self.has_edge_conditions() {
            return true;
        }

        // Node records have no endpoints, so any edge condition excludes them
        match &metadata.edge {
            Some(edge) => {
                eq(&self.bf_sid, &edge.bf_sid)
                    && eq(&self.bf_s_class_name, &edge.bf_s_class_name)
                    && eq(&self.bf_tid, &edge.bf_tid)
                    && eq(&self.bf_t_class_name, &edge.bf_t_class_name)
            }
            None => false,
        }
    }
}
