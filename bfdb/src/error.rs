// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the node/edge graph layer
//!
//! Every failure in this crate surfaces as a [`BfDbError`]. The node and edge
//! layers never retry and never swallow errors; the single tolerated absence is
//! "no matching relationship", which traversal methods report as an empty Vec.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BfDbError {
    /// `find_x`/`load` found no record for the id (in the viewer's scope)
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The storage adapter rejected a write
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// The storage adapter failed a read for a reason other than absence
    #[error("Storage query failed: {0}")]
    StorageQuery(String),

    /// A stored record was materialized as the wrong concrete type
    #[error("Class mismatch: expected {expected}, found {found}")]
    ClassMismatch { expected: String, found: String },

    /// Caller misuse: unsaved edge endpoints, operating on a deleted node, invalid viewer
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A props merge produced a value that does not fit the concrete props type
    #[error("Invalid props: {0}")]
    InvalidProps(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BfDbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BfDbError::NodeNotFound(_))
    }
}

impl From<serde_json::Error> for BfDbError {
    fn from(err: serde_json::Error) -> Self {
        BfDbError::Serialization(err.to_string())
    }
}

pub type BfDbResult<T> = Result<T, BfDbError>;
