// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Current viewer context
//!
//! The viewer is the acting principal for a request. It supplies the owning
//! organization (`bfOid`) stamped on new nodes and used to scope every lookup,
//! and the actor id recorded as `bfCid`.

use crate::error::{BfDbError, BfDbResult};
use crate::ids::BfGid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level of a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ViewerPrivilege {
    /// Implicitly scoped to its own organization
    #[default]
    Standard,
    /// May read across organizations
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentViewer {
    pub org_bf_oid: BfGid,
    pub person_bf_gid: BfGid,
    pub privilege: ViewerPrivilege,
}

impl CurrentViewer {
    pub fn new(org_bf_oid: impl Into<BfGid>, person_bf_gid: impl Into<BfGid>) -> Self {
        Self {
            org_bf_oid: org_bf_oid.into(),
            person_bf_gid: person_bf_gid.into(),
            privilege: ViewerPrivilege::Standard,
        }
    }

    pub fn admin(org_bf_oid: impl Into<BfGid>, person_bf_gid: impl Into<BfGid>) -> Self {
        Self {
            privilege: ViewerPrivilege::Admin,
            ..Self::new(org_bf_oid, person_bf_gid)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.privilege == ViewerPrivilege::Admin
    }

    /// Organization scope applied to storage lookups; `None` for admins
    pub fn owner_scope(&self) -> Option<&BfGid> {
        if self.is_admin() {
            None
        } else {
            Some(&self.org_bf_oid)
        }
    }

    /// A viewer without an organization cannot own or look up nodes
    pub fn validate(&self) -> BfDbResult<()> {
        if self.org_bf_oid.is_empty() {
            return Err(BfDbError::Precondition(
                "viewer has no organization id".to_string(),
            ));
        }
        if self.person_bf_gid.is_empty() {
            return Err(BfDbError::Precondition(
                "viewer has no actor id".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for CurrentViewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Viewer#{}@{}", self.person_bf_gid, self.org_bf_oid)?;
        if self.is_admin() {
            write!(f, "(admin)")?;
        }
        Ok(())
    }
}
