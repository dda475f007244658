//! In-memory [`Store`] implementation.
//!
//! All tables live behind one `RwLock`, so every write (including a whole
//! subtree cascade) happens inside a single critical section. Listings are
//! sorted the same way the Postgres store sorts them.

use std::collections::HashSet;

use async_trait::async_trait;
use roster_core::{AuthError, AuthResult};
use roster_models::{
    Collection, CollectionFilter, CollectionId, DeviceOwner, DeviceOwnerId, FacilityUser,
    FacilityUserId, Membership, MembershipFilter, MembershipId, Role, RoleFilter, RoleId,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::Store;

#[derive(Debug, Default)]
struct Tables {
    collections: Vec<Collection>,
    facility_users: Vec<FacilityUser>,
    device_owners: Vec<DeviceOwner>,
    memberships: Vec<Membership>,
    roles: Vec<Role>,
}

impl Tables {
    fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    fn facility_user(&self, id: FacilityUserId) -> Option<&FacilityUser> {
        self.facility_users.iter().find(|u| u.id == id)
    }

    /// `root` plus every collection below it.
    fn subtree(&self, root: CollectionId) -> HashSet<CollectionId> {
        let mut ids = HashSet::from([root]);
        let mut frontier = vec![root];

        while let Some(parent) = frontier.pop() {
            for child in self
                .collections
                .iter()
                .filter(|c| c.parent_id == Some(parent))
            {
                if ids.insert(child.id) {
                    frontier.push(child.id);
                }
            }
        }

        ids
    }

    fn check_references(
        &self,
        user_id: FacilityUserId,
        collection_id: CollectionId,
    ) -> AuthResult<()> {
        if self.facility_user(user_id).is_none() {
            return Err(AuthError::integrity(format!(
                "facility user {} does not exist",
                user_id
            )));
        }
        if self.collection(collection_id).is_none() {
            return Err(AuthError::integrity(format!(
                "collection {} does not exist",
                collection_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_collection(&self, collection: &Collection) -> AuthResult<()> {
        collection.check_integrity()?;

        let mut tables = self.tables.write().await;
        if tables.collection(collection.id).is_some() {
            return Err(AuthError::integrity(format!(
                "collection {} already exists",
                collection.id
            )));
        }
        if let Some(parent_id) = collection.parent_id
            && tables.collection(parent_id).is_none()
        {
            return Err(AuthError::integrity(format!(
                "parent collection {} does not exist",
                parent_id
            )));
        }

        tables.collections.push(collection.clone());
        Ok(())
    }

    async fn get_collection(&self, id: CollectionId) -> AuthResult<Option<Collection>> {
        Ok(self.tables.read().await.collection(id).cloned())
    }

    async fn list_collections(&self, filter: CollectionFilter) -> AuthResult<Vec<Collection>> {
        let tables = self.tables.read().await;
        let mut collections: Vec<Collection> = tables
            .collections
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(collections)
    }

    async fn delete_collection_tree(&self, id: CollectionId) -> AuthResult<Vec<CollectionId>> {
        let mut tables = self.tables.write().await;
        if tables.collection(id).is_none() {
            return Ok(Vec::new());
        }

        let doomed = tables.subtree(id);
        let removed: Vec<CollectionId> = tables
            .collections
            .iter()
            .map(|c| c.id)
            .filter(|cid| doomed.contains(cid))
            .collect();

        // Users are owned by their facility.
        let doomed_users: HashSet<FacilityUserId> = tables
            .facility_users
            .iter()
            .filter(|u| doomed.contains(&u.facility_id))
            .map(|u| u.id)
            .collect();

        tables.memberships.retain(|m| {
            !doomed.contains(&m.collection_id) && !doomed_users.contains(&m.user_id)
        });
        tables
            .roles
            .retain(|r| !doomed.contains(&r.collection_id) && !doomed_users.contains(&r.user_id));
        tables
            .facility_users
            .retain(|u| !doomed_users.contains(&u.id));
        tables.collections.retain(|c| !doomed.contains(&c.id));

        debug!(
            collection_id = %id,
            removed_collections = removed.len(),
            removed_users = doomed_users.len(),
            "Deleted collection subtree"
        );

        Ok(removed)
    }

    async fn insert_facility_user(&self, user: &FacilityUser) -> AuthResult<()> {
        let mut tables = self.tables.write().await;

        match tables.collection(user.facility_id) {
            Some(facility) if facility.is_facility() => {}
            Some(other) => {
                return Err(AuthError::integrity(format!(
                    "user facility {} is a {}",
                    other.id, other.kind
                )));
            }
            None => {
                return Err(AuthError::integrity(format!(
                    "facility {} does not exist",
                    user.facility_id
                )));
            }
        }
        if tables.facility_user(user.id).is_some() {
            return Err(AuthError::integrity(format!(
                "facility user {} already exists",
                user.id
            )));
        }
        if tables
            .facility_users
            .iter()
            .any(|u| u.facility_id == user.facility_id && u.username == user.username)
        {
            return Err(AuthError::integrity(format!(
                "username {:?} is already taken in this facility",
                user.username
            )));
        }

        tables.facility_users.push(user.clone());
        Ok(())
    }

    async fn get_facility_user(&self, id: FacilityUserId) -> AuthResult<Option<FacilityUser>> {
        Ok(self.tables.read().await.facility_user(id).cloned())
    }

    async fn list_facility_users(
        &self,
        facility_id: CollectionId,
    ) -> AuthResult<Vec<FacilityUser>> {
        let tables = self.tables.read().await;
        let mut users: Vec<FacilityUser> = tables
            .facility_users
            .iter()
            .filter(|u| u.facility_id == facility_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn delete_facility_user(&self, id: FacilityUserId) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.facility_users.len();

        tables.facility_users.retain(|u| u.id != id);
        if tables.facility_users.len() == before {
            return Ok(false);
        }

        tables.memberships.retain(|m| m.user_id != id);
        tables.roles.retain(|r| r.user_id != id);
        Ok(true)
    }

    async fn insert_device_owner(&self, owner: &DeviceOwner) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .device_owners
            .iter()
            .any(|o| o.id == owner.id || o.username == owner.username)
        {
            return Err(AuthError::integrity(format!(
                "device owner {:?} already exists",
                owner.username
            )));
        }

        tables.device_owners.push(owner.clone());
        Ok(())
    }

    async fn get_device_owner(&self, id: DeviceOwnerId) -> AuthResult<Option<DeviceOwner>> {
        let tables = self.tables.read().await;
        Ok(tables.device_owners.iter().find(|o| o.id == id).cloned())
    }

    async fn delete_device_owner(&self, id: DeviceOwnerId) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.device_owners.len();
        tables.device_owners.retain(|o| o.id != id);
        Ok(tables.device_owners.len() != before)
    }

    async fn insert_membership(&self, membership: &Membership) -> AuthResult<Membership> {
        let mut tables = self.tables.write().await;
        tables.check_references(membership.user_id, membership.collection_id)?;

        let filter = MembershipFilter::exact(membership.user_id, membership.collection_id);
        if let Some(existing) = tables.memberships.iter().find(|m| filter.matches(m)) {
            return Ok(existing.clone());
        }

        tables.memberships.push(membership.clone());
        Ok(membership.clone())
    }

    async fn find_memberships(&self, filter: MembershipFilter) -> AuthResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn delete_membership(&self, id: MembershipId) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.memberships.len();
        tables.memberships.retain(|m| m.id != id);
        Ok(tables.memberships.len() != before)
    }

    async fn insert_role(&self, role: &Role) -> AuthResult<Role> {
        let mut tables = self.tables.write().await;
        tables.check_references(role.user_id, role.collection_id)?;

        let filter = RoleFilter::exact(role.user_id, role.collection_id, role.kind);
        if let Some(existing) = tables.roles.iter().find(|r| filter.matches(r)) {
            return Ok(existing.clone());
        }

        tables.roles.push(role.clone());
        Ok(role.clone())
    }

    async fn find_roles(&self, filter: RoleFilter) -> AuthResult<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn delete_role(&self, id: RoleId) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.roles.len();
        tables.roles.retain(|r| r.id != id);
        Ok(tables.roles.len() != before)
    }
}
