//! Collection tree models.
//!
//! A collection is a node in the organizational hierarchy. There is a single
//! `Collection` type carrying a [`CollectionKind`] tag; the rules about which
//! kinds may sit under which are keyed on that tag rather than expressed as
//! separate types.
//!
//! ```text
//! Facility            (root, no parent)
//!   └── Classroom     (parent must be a Facility)
//!         └── LearnerGroup  (parent must be a Classroom)
//! ```

use crate::ids::CollectionId;
use roster_core::{AuthError, AuthResult, validate_dto};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Facility,
    Classroom,
    LearnerGroup,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Facility, Self::Classroom, Self::LearnerGroup];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Facility => "facility",
            Self::Classroom => "classroom",
            Self::LearnerGroup => "learnergroup",
        }
    }

    /// The kind a node of this kind must hang under, or `None` for the root.
    pub const fn parent_kind(&self) -> Option<CollectionKind> {
        match self {
            Self::Facility => None,
            Self::Classroom => Some(Self::Facility),
            Self::LearnerGroup => Some(Self::Classroom),
        }
    }

    /// Checks a prospective parent against the hierarchy rules for this kind.
    pub fn validate_parent(&self, parent: Option<&Collection>) -> AuthResult<()> {
        match (self.parent_kind(), parent) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(AuthError::validation(format!(
                "a {} cannot have a parent",
                self
            ))),
            (Some(expected), None) => Err(AuthError::validation(format!(
                "a {} must have a {} as its parent",
                self, expected
            ))),
            (Some(expected), Some(parent)) if parent.kind != expected => {
                Err(AuthError::validation(format!(
                    "a {} must have a {} as its parent, not a {}",
                    self, expected, parent.kind
                )))
            }
            (Some(_), Some(_)) => Ok(()),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facility" => Ok(Self::Facility),
            "classroom" => Ok(Self::Classroom),
            "learnergroup" => Ok(Self::LearnerGroup),
            other => Err(AuthError::validation(format!(
                "unknown collection kind {:?}",
                other
            ))),
        }
    }
}

/// A node in the collection tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub kind: CollectionKind,
    pub name: String,
    pub parent_id: Option<CollectionId>,
}

impl Collection {
    /// Builds a node without any validation. Useful for exercising the
    /// store's own integrity checks.
    pub fn unchecked(
        kind: CollectionKind,
        name: impl Into<String>,
        parent_id: Option<CollectionId>,
    ) -> Self {
        Self {
            id: CollectionId::new(),
            kind,
            name: name.into(),
            parent_id,
        }
    }

    #[inline]
    pub fn is_facility(&self) -> bool {
        self.kind == CollectionKind::Facility
    }

    /// Structural check the store applies on insert: roots must be
    /// facilities and everything else must have a parent.
    pub fn check_integrity(&self) -> AuthResult<()> {
        match (self.kind, self.parent_id) {
            (CollectionKind::Facility, Some(_)) => Err(AuthError::integrity(format!(
                "facility {} cannot have a parent",
                self.id
            ))),
            (CollectionKind::Classroom | CollectionKind::LearnerGroup, None) => {
                Err(AuthError::integrity(format!(
                    "{} {} requires a parent",
                    self.kind, self.id
                )))
            }
            _ => Ok(()),
        }
    }
}

/// `"Arkham" (facility)`
impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.name, self.kind)
    }
}

/// DTO for creating a collection.
///
/// `kind` is optional so that callers forwarding untyped input get a
/// validation error rather than a panic when it is missing.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCollection {
    pub kind: Option<CollectionKind>,
    #[validate(length(max = 100, message = "Name must not exceed 100 characters"))]
    pub name: String,
    pub parent_id: Option<CollectionId>,
}

impl NewCollection {
    pub fn facility(name: impl Into<String>) -> Self {
        Self {
            kind: Some(CollectionKind::Facility),
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn classroom(name: impl Into<String>, facility: &Collection) -> Self {
        Self {
            kind: Some(CollectionKind::Classroom),
            name: name.into(),
            parent_id: Some(facility.id),
        }
    }

    pub fn learner_group(name: impl Into<String>, classroom: &Collection) -> Self {
        Self {
            kind: Some(CollectionKind::LearnerGroup),
            name: name.into(),
            parent_id: Some(classroom.id),
        }
    }

    /// Validates the DTO against its resolved parent and produces the node to
    /// insert.
    ///
    /// `parent` must be the collection `parent_id` refers to, or `None` when
    /// `parent_id` is `None`.
    pub fn into_collection(self, parent: Option<&Collection>) -> AuthResult<Collection> {
        validate_dto(&self)?;

        let kind = self
            .kind
            .ok_or_else(|| AuthError::validation("Collection kind is required"))?;

        if self.parent_id != parent.map(|p| p.id) {
            return Err(AuthError::validation("parent does not match parent_id"));
        }
        kind.validate_parent(parent)?;

        Ok(Collection {
            id: CollectionId::new(),
            kind,
            name: self.name,
            parent_id: self.parent_id,
        })
    }
}

/// Exact-match filter for collection lookups. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    pub kind: Option<CollectionKind>,
    pub parent_id: Option<CollectionId>,
}

impl CollectionFilter {
    pub fn kind(kind: CollectionKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn children_of(parent_id: CollectionId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, collection: &Collection) -> bool {
        self.kind.is_none_or(|kind| kind == collection.kind)
            && self
                .parent_id
                .is_none_or(|id| collection.parent_id == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility() -> Collection {
        NewCollection::facility("Arkham").into_collection(None).unwrap()
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in CollectionKind::ALL {
            assert_eq!(kind.as_str().parse::<CollectionKind>().unwrap(), kind);
        }
        assert!("school".parse::<CollectionKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&CollectionKind::LearnerGroup).unwrap();
        assert_eq!(json, r#""learnergroup""#);
    }

    #[test]
    fn test_facility_cannot_have_parent() {
        let root = facility();
        let dto = NewCollection {
            kind: Some(CollectionKind::Facility),
            name: "Nested".to_string(),
            parent_id: Some(root.id),
        };
        assert!(matches!(
            dto.into_collection(Some(&root)),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_parentless_classroom_and_learner_group_are_invalid() {
        for kind in [CollectionKind::Classroom, CollectionKind::LearnerGroup] {
            let dto = NewCollection {
                kind: Some(kind),
                name: "orphan".to_string(),
                parent_id: None,
            };
            assert!(matches!(
                dto.into_collection(None),
                Err(AuthError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_learner_group_requires_classroom_parent() {
        let root = facility();
        let dto = NewCollection::learner_group("group", &root);
        assert!(matches!(
            dto.into_collection(Some(&root)),
            Err(AuthError::Validation(_))
        ));

        let classroom = NewCollection::classroom("class", &root)
            .into_collection(Some(&root))
            .unwrap();
        let group = NewCollection::learner_group("group", &classroom)
            .into_collection(Some(&classroom))
            .unwrap();
        assert_eq!(group.parent_id, Some(classroom.id));
    }

    #[test]
    fn test_missing_kind_is_invalid() {
        let root = facility();
        let dto = NewCollection {
            kind: None,
            name: "qqq".to_string(),
            parent_id: Some(root.id),
        };
        assert!(matches!(
            dto.into_collection(Some(&root)),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_name_length_is_validated() {
        let dto = NewCollection::facility("x".repeat(101));
        assert!(matches!(
            dto.into_collection(None),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_check_integrity() {
        let root = facility();
        assert!(root.check_integrity().is_ok());

        let orphan = Collection::unchecked(CollectionKind::Classroom, "myclass", None);
        assert!(matches!(
            orphan.check_integrity(),
            Err(AuthError::Integrity(_))
        ));

        let nested = Collection::unchecked(CollectionKind::Facility, "blah", Some(root.id));
        assert!(matches!(
            nested.check_integrity(),
            Err(AuthError::Integrity(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(facility().to_string(), r#""Arkham" (facility)"#);
    }
}
