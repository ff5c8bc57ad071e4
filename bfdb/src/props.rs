// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Typed node properties and property filters

use crate::error::{BfDbError, BfDbResult};
use crate::metadata::BfMetadata;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Property record of a concrete node type.
///
/// `CLASS_NAME` is the node's class identity in storage; two props types must
/// never share a class name.
pub trait BfNodeProps:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    const CLASS_NAME: &'static str;

    /// Runs before the first write of a new node. An error aborts the
    /// create and nothing is stored.
    fn before_create(&mut self, _metadata: &BfMetadata) -> BfDbResult<()> {
        Ok(())
    }

    /// Runs after the first write succeeded. An error is returned to the
    /// caller but the record stays stored.
    fn after_create(&self, _metadata: &BfMetadata) -> BfDbResult<()> {
        Ok(())
    }
}

/// Serialize props into the JSON object shape stored by adapters
pub fn props_to_json<P: BfNodeProps>(props: &P) -> BfDbResult<Value> {
    let value = serde_json::to_value(props)?;
    if !value.is_object() {
        return Err(BfDbError::InvalidProps(format!(
            "{} props must serialize to a JSON object",
            P::CLASS_NAME
        )));
    }
    Ok(value)
}

pub fn props_from_json<P: BfNodeProps>(value: Value) -> BfDbResult<P> {
    serde_json::from_value(value).map_err(|e| {
        BfDbError::InvalidProps(format!("{} props: {}", P::CLASS_NAME, e))
    })
}

/// Shallow merge: top-level keys of `partial` replace those of `props`
pub fn merge_props<P: BfNodeProps>(props: &P, partial: Map<String, Value>) -> BfDbResult<P> {
    let Value::Object(mut current) = props_to_json(props)? else {
        return Err(BfDbError::InvalidProps(format!(
            "{} props are not an object",
            P::CLASS_NAME
        )));
    };
    for (key, value) in partial {
        current.insert(key, value);
    }
    props_from_json(Value::Object(current))
}

/// Top-level equality filter on props; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropsFilter(BTreeMap<String, Value>);

impl PropsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a single edge role
    pub fn role(role: impl Into<String>) -> Self {
        Self::new().with("role", role.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Build from a JSON object; anything else is a malformed filter
    pub fn from_json(value: Value) -> BfDbResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            Value::Null => Ok(Self::new()),
            other => Err(BfDbError::StorageQuery(format!(
                "props filter must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn matches(&self, props: &Value) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| props.get(key) == Some(expected))
    }
}
