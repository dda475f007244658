//! The persistence interface.
//!
//! Lookups are exact-match filters on (user, collection, kind). Cascades follow
//! the ownership rules of the model:
//!
//! - deleting a collection removes its whole subtree, every membership and role
//!   that references a removed collection, and (for a facility) the facility
//!   users scoped to it
//! - deleting a facility user removes their memberships and roles
//!
//! Each cascade is a single atomic operation. Implementations must reject rows
//! that violate the structural constraints with [`AuthError::Integrity`], even
//! when the caller skipped validation.
//!
//! [`AuthError::Integrity`]: roster_core::AuthError::Integrity

use async_trait::async_trait;
use roster_core::AuthResult;
use roster_models::{
    Collection, CollectionFilter, CollectionId, DeviceOwner, DeviceOwnerId, FacilityUser,
    FacilityUserId, Membership, MembershipFilter, MembershipId, Role, RoleFilter, RoleId,
};

#[async_trait]
pub trait Store: Send + Sync {
    // ============ Collections ============

    /// Inserts a node. Facilities must not have a parent, everything else must
    /// have an existing one.
    async fn insert_collection(&self, collection: &Collection) -> AuthResult<()>;

    async fn get_collection(&self, id: CollectionId) -> AuthResult<Option<Collection>>;

    /// Matching nodes, ordered by name and then by ID.
    async fn list_collections(&self, filter: CollectionFilter) -> AuthResult<Vec<Collection>>;

    /// Removes `id` and its subtree with all dependent rows, atomically.
    ///
    /// Returns the IDs of the removed collections, or an empty list when `id`
    /// did not exist.
    async fn delete_collection_tree(&self, id: CollectionId) -> AuthResult<Vec<CollectionId>>;

    // ============ Facility users ============

    /// Inserts a user. The facility must exist and the username must be unique
    /// within it.
    async fn insert_facility_user(&self, user: &FacilityUser) -> AuthResult<()>;

    async fn get_facility_user(&self, id: FacilityUserId) -> AuthResult<Option<FacilityUser>>;

    /// Users of one facility, ordered by username.
    async fn list_facility_users(
        &self,
        facility_id: CollectionId,
    ) -> AuthResult<Vec<FacilityUser>>;

    /// Removes the user with their memberships and roles, atomically.
    async fn delete_facility_user(&self, id: FacilityUserId) -> AuthResult<bool>;

    // ============ Device owners ============

    /// Inserts a device owner. Usernames are unique across device owners.
    async fn insert_device_owner(&self, owner: &DeviceOwner) -> AuthResult<()>;

    async fn get_device_owner(&self, id: DeviceOwnerId) -> AuthResult<Option<DeviceOwner>>;

    async fn delete_device_owner(&self, id: DeviceOwnerId) -> AuthResult<bool>;

    // ============ Memberships ============

    /// Inserts a membership, or returns the stored row when the same
    /// (user, collection) pair already exists.
    async fn insert_membership(&self, membership: &Membership) -> AuthResult<Membership>;

    async fn find_memberships(&self, filter: MembershipFilter) -> AuthResult<Vec<Membership>>;

    async fn delete_membership(&self, id: MembershipId) -> AuthResult<bool>;

    // ============ Roles ============

    /// Inserts a role, or returns the stored row when the same
    /// (user, collection, kind) triple already exists.
    async fn insert_role(&self, role: &Role) -> AuthResult<Role>;

    async fn find_roles(&self, filter: RoleFilter) -> AuthResult<Vec<Role>>;

    async fn delete_role(&self, id: RoleId) -> AuthResult<bool>;
}
