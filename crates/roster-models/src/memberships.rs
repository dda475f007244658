//! Membership rows.
//!
//! A membership records that a facility user belongs *directly* to a
//! collection. Membership in a collection implies membership in all of its
//! ancestors, but those inherited memberships are never stored.

use crate::collections::Collection;
use crate::ids::{CollectionId, FacilityUserId, MembershipId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: FacilityUserId,
    pub collection_id: CollectionId,
}

impl Membership {
    pub fn new(user_id: FacilityUserId, collection_id: CollectionId) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            collection_id,
        }
    }

    /// `"foo"@"Arkham"'s membership in "Oodles of Fun" (learnergroup)`
    pub fn label(&self, user_label: &str, collection: &Collection) -> String {
        format!("{}'s membership in {}", user_label, collection)
    }
}

/// Exact-match filter for membership lookups. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipFilter {
    pub user_id: Option<FacilityUserId>,
    pub collection_id: Option<CollectionId>,
}

impl MembershipFilter {
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

    pub fn exact(user_id: FacilityUserId, collection_id: CollectionId) -> Self {
        Self {
            user_id: Some(user_id),
            collection_id: Some(collection_id),
        }
    }

    pub fn matches(&self, membership: &Membership) -> bool {
        self.user_id.is_none_or(|id| id == membership.user_id)
            && self
                .collection_id
                .is_none_or(|id| id == membership.collection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        let user = FacilityUserId::new();
        let collection = CollectionId::new();
        let membership = Membership::new(user, collection);

        assert!(MembershipFilter::default().matches(&membership));
        assert!(MembershipFilter::user(user).matches(&membership));
        let exact = MembershipFilter::exact(user, collection);
        assert!(exact.matches(&membership));

        let elsewhere = MembershipFilter::exact(user, CollectionId::new());
        assert!(!elsewhere.matches(&membership));
        let someone_else = MembershipFilter::user(FacilityUserId::new());
        assert!(!someone_else.matches(&membership));
    }
}
