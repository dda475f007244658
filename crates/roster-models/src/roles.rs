//! Role rows and role kinds.
//!
//! A role records that a facility user holds a kind of authority *directly*
//! over a collection. Roles flow down the tree: an admin of a facility is an
//! admin of every classroom and learner group under it, without extra rows.

use crate::collections::Collection;
use crate::ids::{CollectionId, FacilityUserId, RoleId};
use roster_core::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Admin,
    Coach,
}

impl RoleKind {
    pub const ALL: [RoleKind; 2] = [Self::Admin, Self::Coach];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Coach => "coach",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "coach" => Ok(Self::Coach),
            other => Err(AuthError::InvalidRoleKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub user_id: FacilityUserId,
    pub collection_id: CollectionId,
    pub kind: RoleKind,
}

impl Role {
    pub fn new(user_id: FacilityUserId, collection_id: CollectionId, kind: RoleKind) -> Self {
        Self {
            id: RoleId::new(),
            user_id,
            collection_id,
            kind,
        }
    }

    /// `"bar"@"Arkham"'s coach role for "Classroom X" (classroom)`
    pub fn label(&self, user_label: &str, collection: &Collection) -> String {
        format!("{}'s {} role for {}", user_label, self.kind, collection)
    }
}

/// Exact-match filter for role lookups. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub user_id: Option<FacilityUserId>,
    pub collection_id: Option<CollectionId>,
    pub kind: Option<RoleKind>,
}

impl RoleFilter {
    pub fn user(user_id: FacilityUserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn collection(collection_id: CollectionId) -> Self {
        Self {
            collection_id: Some(collection_id),
            ..Self::default()
        }
    }

    pub fn exact(user_id: FacilityUserId, collection_id: CollectionId, kind: RoleKind) -> Self {
        Self {
            user_id: Some(user_id),
            collection_id: Some(collection_id),
            kind: Some(kind),
        }
    }

    pub fn with_kind(mut self, kind: RoleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, role: &Role) -> bool {
        self.user_id.is_none_or(|id| id == role.user_id)
            && self.collection_id.is_none_or(|id| id == role.collection_id)
            && self.kind.is_none_or(|kind| kind == role.kind)
    }
}
