//! PostgreSQL [`Store`] implementation.
//!
//! Schema management is outside this crate; the store expects these tables:
//!
//! ```text
//! collections     (id UUID PK, kind TEXT, name TEXT, parent_id UUID NULL -> collections,
//!                  CHECK ((kind = 'facility') = (parent_id IS NULL)))
//! facility_users  (id UUID PK, username TEXT, facility_id UUID -> collections,
//!                  date_joined TIMESTAMPTZ, UNIQUE (facility_id, username))
//! device_owners   (id UUID PK, username TEXT UNIQUE, date_joined TIMESTAMPTZ)
//! memberships     (id UUID PK, user_id UUID -> facility_users, collection_id UUID -> collections,
//!                  UNIQUE (user_id, collection_id))
//! roles           (id UUID PK, user_id UUID -> facility_users, collection_id UUID -> collections,
//!                  kind TEXT, UNIQUE (user_id, collection_id, kind))
//! ```
//!
//! Foreign keys are plain (no `ON DELETE CASCADE`): cascades are spelled out
//! here, each inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{AuthError, AuthResult};
use roster_models::{
    Collection, CollectionFilter, CollectionId, DeviceOwner, DeviceOwnerId, FacilityUser,
    FacilityUserId, Membership, MembershipFilter, MembershipId, Role, RoleFilter, RoleId,
};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

use crate::store::Store;

/// Maps constraint violations to `Integrity` and everything else to `Database`.
fn map_db_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err
        && (db_err.is_unique_violation()
            || db_err.is_foreign_key_violation()
            || db_err.is_check_violation())
    {
        return AuthError::integrity(db_err.message().to_string());
    }
    AuthError::database(err)
}

#[derive(FromRow)]
struct CollectionRow {
    id: CollectionId,
    kind: String,
    name: String,
    parent_id: Option<CollectionId>,
}

impl TryFrom<CollectionRow> for Collection {
    type Error = AuthError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(|_| {
            AuthError::integrity(format!("collection {} has unknown kind {:?}", row.id, row.kind))
        })?;

        Ok(Collection {
            id: row.id,
            kind,
            name: row.name,
            parent_id: row.parent_id,
        })
    }
}

#[derive(FromRow)]
struct FacilityUserRow {
    id: FacilityUserId,
    username: String,
    facility_id: CollectionId,
    date_joined: DateTime<Utc>,
}

impl From<FacilityUserRow> for FacilityUser {
    fn from(row: FacilityUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            facility_id: row.facility_id,
            date_joined: row.date_joined,
        }
    }
}

#[derive(FromRow)]
struct DeviceOwnerRow {
    id: DeviceOwnerId,
    username: String,
    date_joined: DateTime<Utc>,
}

#[derive(FromRow)]
struct MembershipRow {
    id: MembershipId,
    user_id: FacilityUserId,
    collection_id: CollectionId,
}

#[derive(FromRow)]
struct RoleRow {
    id: RoleId,
    user_id: FacilityUserId,
    collection_id: CollectionId,
    kind: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = AuthError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(|_| {
            AuthError::integrity(format!("role {} has unknown kind {:?}", row.id, row.kind))
        })?;

        Ok(Role {
            id: row.id,
            user_id: row.user_id,
            collection_id: row.collection_id,
            kind,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_collection(&self, collection: &Collection) -> AuthResult<()> {
        // Same structural rule as the CHECK constraint, reported without a round trip.
        collection.check_integrity()?;

        sqlx::query("INSERT INTO collections (id, kind, name, parent_id) VALUES ($1, $2, $3, $4)")
            .bind(collection.id)
            .bind(collection.kind.as_str())
            .bind(&collection.name)
            .bind(collection.parent_id)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    async fn get_collection(&self, id: CollectionId) -> AuthResult<Option<Collection>> {
        sqlx::query_as::<_, CollectionRow>(
            "SELECT id, kind, name, parent_id FROM collections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?
        .map(Collection::try_from)
        .transpose()
    }

    async fn list_collections(&self, filter: CollectionFilter) -> AuthResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            r#"SELECT id, kind, name, parent_id FROM collections
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::uuid IS NULL OR parent_id = $2)
            ORDER BY name COLLATE "C", id"#,
        )
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.parent_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Collection::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_collection_tree(&self, id: CollectionId) -> AuthResult<Vec<CollectionId>> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;

        let removed: Vec<CollectionId> = sqlx::query_scalar(
            r#"WITH RECURSIVE subtree AS (
                SELECT id FROM collections WHERE id = $1
                UNION ALL
                SELECT c.id FROM collections c JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id FROM subtree"#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if removed.is_empty() {
            return Ok(removed);
        }

        let users: Vec<FacilityUserId> =
            sqlx::query_scalar("SELECT id FROM facility_users WHERE facility_id = ANY($1)")
                .bind(&removed)
                .fetch_all(&mut *tx)
                .await
                .map_err(map_db_error)?;

        sqlx::query("DELETE FROM memberships WHERE collection_id = ANY($1) OR user_id = ANY($2)")
            .bind(&removed)
            .bind(&users)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query("DELETE FROM roles WHERE collection_id = ANY($1) OR user_id = ANY($2)")
            .bind(&removed)
            .bind(&users)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query("DELETE FROM facility_users WHERE id = ANY($1)")
            .bind(&users)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query("DELETE FROM collections WHERE id = ANY($1)")
            .bind(&removed)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        debug!(
            removed_collections = removed.len(),
            removed_users = users.len(),
            "Deleted collection subtree"
        );

        Ok(removed)
    }

    async fn insert_facility_user(&self, user: &FacilityUser) -> AuthResult<()> {
        // The FK only proves the row exists; users may only hang off facilities.
        let kind: Option<String> =
            sqlx::query_scalar("SELECT kind FROM collections WHERE id = $1")
                .bind(user.facility_id)
                .fetch_optional(&self.db)
                .await
                .map_err(map_db_error)?;
        match kind.as_deref() {
            Some("facility") => {}
            Some(other) => {
                return Err(AuthError::integrity(format!(
                    "user facility {} is a {}",
                    user.facility_id, other
                )));
            }
            None => {
                return Err(AuthError::integrity(format!(
                    "facility {} does not exist",
                    user.facility_id
                )));
            }
        }

        sqlx::query(
            r#"INSERT INTO facility_users (id, username, facility_id, date_joined)
            VALUES ($1, $2, $3, $4)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.facility_id)
        .bind(user.date_joined)
        .execute(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn get_facility_user(&self, id: FacilityUserId) -> AuthResult<Option<FacilityUser>> {
        let row = sqlx::query_as::<_, FacilityUserRow>(
            "SELECT id, username, facility_id, date_joined FROM facility_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(FacilityUser::from))
    }

    async fn list_facility_users(
        &self,
        facility_id: CollectionId,
    ) -> AuthResult<Vec<FacilityUser>> {
        let rows = sqlx::query_as::<_, FacilityUserRow>(
            r#"SELECT id, username, facility_id, date_joined FROM facility_users
            WHERE facility_id = $1 ORDER BY username COLLATE "C""#,
        )
        .bind(facility_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(FacilityUser::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_facility_user(&self, id: FacilityUserId) -> AuthResult<bool> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;

        sqlx::query("DELETE FROM memberships WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query("DELETE FROM roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let result = sqlx::query("DELETE FROM facility_users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_device_owner(&self, owner: &DeviceOwner) -> AuthResult<()> {
        sqlx::query("INSERT INTO device_owners (id, username, date_joined) VALUES ($1, $2, $3)")
            .bind(owner.id)
            .bind(&owner.username)
            .bind(owner.date_joined)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    async fn get_device_owner(&self, id: DeviceOwnerId) -> AuthResult<Option<DeviceOwner>> {
        let row = sqlx::query_as::<_, DeviceOwnerRow>(
            "SELECT id, username, date_joined FROM device_owners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|row| DeviceOwner {
            id: row.id,
            username: row.username,
            date_joined: row.date_joined,
        }))
    }

    async fn delete_device_owner(&self, id: DeviceOwnerId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM device_owners WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_membership(&self, membership: &Membership) -> AuthResult<Membership> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"INSERT INTO memberships (id, user_id, collection_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, collection_id)
            DO UPDATE SET collection_id = EXCLUDED.collection_id
            RETURNING id, user_id, collection_id"#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.collection_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(Membership {
            id: row.id,
            user_id: row.user_id,
            collection_id: row.collection_id,
        })
    }

    async fn find_memberships(&self, filter: MembershipFilter) -> AuthResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"SELECT id, user_id, collection_id FROM memberships
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR collection_id = $2)"#,
        )
        .bind(filter.user_id)
        .bind(filter.collection_id)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| Membership {
                id: row.id,
                user_id: row.user_id,
                collection_id: row.collection_id,
            })
            .collect())
    }

    async fn delete_membership(&self, id: MembershipId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_role(&self, role: &Role) -> AuthResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"INSERT INTO roles (id, user_id, collection_id, kind)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, collection_id, kind)
            DO UPDATE SET kind = EXCLUDED.kind
            RETURNING id, user_id, collection_id, kind"#,
        )
        .bind(role.id)
        .bind(role.user_id)
        .bind(role.collection_id)
        .bind(role.kind.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(map_db_error)?;

        Role::try_from(row)
    }

    async fn find_roles(&self, filter: RoleFilter) -> AuthResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"SELECT id, user_id, collection_id, kind FROM roles
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR collection_id = $2)
              AND ($3::text IS NULL OR kind = $3)"#,
        )
        .bind(filter.user_id)
        .bind(filter.collection_id)
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn delete_role(&self, id: RoleId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
