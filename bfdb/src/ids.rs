// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Global identifiers for nodes, edges, organizations and actors

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique identifier (`bfGid`, also used for `bfOid`/`bfCid`/`bfSid`/`bfTid`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BfGid(String);

impl BfGid {
    /// Allocate a fresh UUID v4 based id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for BfGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BfGid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BfGid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for BfGid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
