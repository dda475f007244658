use std::collections::{BTreeSet, HashSet};

use roster_core::{AuthError, AuthResult};
use roster_db::Store;
use roster_models::{
    Actor, Collection, CollectionId, FacilityUser, MembershipFilter, Role, RoleFilter, RoleKind,
};
use tracing::{debug, info, instrument};

use crate::modules::collections::service::{get_collection, lineage};
use crate::modules::memberships::service::check_same_facility;
use crate::modules::users::service::{describe_user, get_facility_user};

// ============ Collection queries ============

/// Kinds `user` holds on `collection` or one of its ancestors.
async fn kinds_over_collection(
    db: &dyn Store,
    user: &FacilityUser,
    collection: &Collection,
) -> AuthResult<BTreeSet<RoleKind>> {
    let roles = db.find_roles(RoleFilter::user(user.id)).await?;
    if roles.is_empty() {
        return Ok(BTreeSet::new());
    }

    let ancestry = lineage(db, collection).await?;
    Ok(roles
        .into_iter()
        .filter(|role| ancestry.contains(&role.collection_id))
        .map(|role| role.kind)
        .collect())
}

/// True when the user holds `kind` directly on `collection` or on one of its
/// ancestors. Device owners hold the admin role everywhere and nothing else.
pub async fn has_role_for_collection(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: RoleKind,
    collection: &Collection,
) -> AuthResult<bool> {
    has_any_role_for_collection(db, actor, &[kind], collection).await
}

#[instrument(skip(db))]
pub async fn has_any_role_for_collection(
    db: &dyn Store,
    actor: Actor<'_>,
    kinds: &[RoleKind],
    collection: &Collection,
) -> AuthResult<bool> {
    let held = get_roles_for_collection(db, actor, collection).await?;
    Ok(kinds.iter().any(|kind| held.contains(kind)))
}

pub async fn get_roles_for_collection(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<BTreeSet<RoleKind>> {
    match actor {
        Actor::DeviceOwner(_) => Ok(BTreeSet::from([RoleKind::Admin])),
        Actor::FacilityUser(user) => kinds_over_collection(db, user, collection).await,
    }
}

// ============ User queries ============

/// Every collection `user` is a member of: their facility, each directly
/// joined collection, and the ancestors of those.
async fn member_collections(
    db: &dyn Store,
    user: &FacilityUser,
) -> AuthResult<HashSet<CollectionId>> {
    let mut collections = HashSet::from([user.facility_id]);

    let memberships = db
        .find_memberships(MembershipFilter::user(user.id))
        .await?;
    for membership in memberships {
        if collections.contains(&membership.collection_id) {
            continue;
        }
        let joined = get_collection(db, membership.collection_id).await?;
        collections.extend(lineage(db, &joined).await?);
    }

    Ok(collections)
}

/// Kinds `actor` holds over `target`: the union over every collection the
/// target is a member of. There is no implicit role over oneself; a facility
/// admin administers themselves only because they sit in the facility.
pub async fn get_roles_for_user(
    db: &dyn Store,
    actor: Actor<'_>,
    target: Actor<'_>,
) -> AuthResult<BTreeSet<RoleKind>> {
    let user = match actor {
        Actor::DeviceOwner(_) => return Ok(BTreeSet::from([RoleKind::Admin])),
        Actor::FacilityUser(user) => user,
    };
    // Device owners are outside every facility.
    let Some(target) = target.as_facility_user() else {
        return Ok(BTreeSet::new());
    };

    let roles = db.find_roles(RoleFilter::user(user.id)).await?;
    if roles.is_empty() {
        return Ok(BTreeSet::new());
    }

    // Member collections are closed under ancestry, so a role on any of them
    // already covers inheritance.
    let collections = member_collections(db, target).await?;
    Ok(roles
        .into_iter()
        .filter(|role| collections.contains(&role.collection_id))
        .map(|role| role.kind)
        .collect())
}

pub async fn has_role_for_user(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: RoleKind,
    target: Actor<'_>,
) -> AuthResult<bool> {
    has_any_role_for_user(db, actor, &[kind], target).await
}

#[instrument(skip(db))]
pub async fn has_any_role_for_user(
    db: &dyn Store,
    actor: Actor<'_>,
    kinds: &[RoleKind],
    target: Actor<'_>,
) -> AuthResult<bool> {
    let held = get_roles_for_user(db, actor, target).await?;
    Ok(kinds.iter().any(|kind| held.contains(kind)))
}

/// Facility users holding `kind` on `collection` directly or through an
/// ancestor, ordered by username.
#[instrument(skip(db))]
pub async fn get_role_holders(
    db: &dyn Store,
    collection: &Collection,
    kind: RoleKind,
) -> AuthResult<Vec<FacilityUser>> {
    let mut seen = HashSet::new();
    let mut holders = Vec::new();

    for collection_id in lineage(db, collection).await? {
        let roles = db
            .find_roles(RoleFilter::collection(collection_id).with_kind(kind))
            .await?;
        for role in roles {
            if seen.insert(role.user_id) {
                holders.push(get_facility_user(db, role.user_id).await?);
            }
        }
    }

    holders.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(holders)
}

// ============ Mutations ============

async fn grant(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: RoleKind,
    collection: &Collection,
) -> AuthResult<Role> {
    let user = actor.require_facility_user()?;
    check_same_facility(db, user, collection).await?;

    let role = db
        .insert_role(&Role::new(user.id, collection.id, kind))
        .await?;

    info!(
        user_id = %user.id,
        collection_id = %collection.id,
        kind = %kind,
        role_id = %role.id,
        "Role granted"
    );

    Ok(role)
}

async fn revoke(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: RoleKind,
    collection: &Collection,
) -> AuthResult<()> {
    let user = actor.require_facility_user()?;

    let direct = db
        .find_roles(RoleFilter::exact(user.id, collection.id, kind))
        .await?;

    if !direct.is_empty() {
        for role in &direct {
            db.delete_role(role.id).await?;
        }
        info!(
            user_id = %user.id,
            collection_id = %collection.id,
            kind = %kind,
            "Role revoked"
        );
        return Ok(());
    }

    let user_label = describe_user(db, actor).await?;
    if has_role_for_collection(db, actor, kind, collection).await? {
        debug!(user_id = %user.id, kind = %kind, "Role is only inherited");
        return Err(AuthError::UserHasRoleOnlyIndirectlyThroughHierarchy {
            user: user_label,
            kind: kind.to_string(),
            collection: collection.to_string(),
        });
    }

    Err(AuthError::UserDoesNotHaveRole {
        user: user_label,
        kind: kind.to_string(),
        collection: collection.to_string(),
    })
}

/// Grants a role by kind name. Granting the same role twice returns the
/// existing row.
///
/// The kind is checked first, so an unknown kind fails with `InvalidRoleKind`
/// even for a device owner.
#[instrument(skip(db))]
pub async fn add_role(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: &str,
    collection: &Collection,
) -> AuthResult<Role> {
    let kind: RoleKind = kind.parse()?;
    grant(db, actor, kind, collection).await
}

/// Revokes a directly held role by kind name.
///
/// Fails with `UserHasRoleOnlyIndirectlyThroughHierarchy` when the role comes
/// from an ancestor, and with `UserDoesNotHaveRole` when it is not held at all.
#[instrument(skip(db))]
pub async fn remove_role(
    db: &dyn Store,
    actor: Actor<'_>,
    kind: &str,
    collection: &Collection,
) -> AuthResult<()> {
    let kind: RoleKind = kind.parse()?;
    revoke(db, actor, kind, collection).await
}

pub async fn add_admin(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<Role> {
    grant(db, actor, RoleKind::Admin, collection).await
}

pub async fn add_coach(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<Role> {
    grant(db, actor, RoleKind::Coach, collection).await
}

pub async fn remove_admin(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<()> {
    revoke(db, actor, RoleKind::Admin, collection).await
}

pub async fn remove_coach(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<()> {
    revoke(db, actor, RoleKind::Coach, collection).await
}

async fn grant_all(
    db: &dyn Store,
    actors: &[Actor<'_>],
    kind: RoleKind,
    collection: &Collection,
) -> AuthResult<Vec<Role>> {
    let mut roles = Vec::with_capacity(actors.len());
    for &actor in actors {
        roles.push(grant(db, actor, kind, collection).await?);
    }
    Ok(roles)
}

/// Grants admin to each user in order, stopping at the first failure. Roles
/// granted before the failure are kept.
pub async fn add_admins(
    db: &dyn Store,
    actors: &[Actor<'_>],
    collection: &Collection,
) -> AuthResult<Vec<Role>> {
    grant_all(db, actors, RoleKind::Admin, collection).await
}

pub async fn add_coaches(
    db: &dyn Store,
    actors: &[Actor<'_>],
    collection: &Collection,
) -> AuthResult<Vec<Role>> {
    grant_all(db, actors, RoleKind::Coach, collection).await
}

// ============ Labels ============

/// `"bar"@"Arkham"'s coach role for "Classroom X" (classroom)`
pub async fn describe_role(db: &dyn Store, role: &Role) -> AuthResult<String> {
    let user = get_facility_user(db, role.user_id).await?;
    let collection = get_collection(db, role.collection_id).await?;
    let user_label = describe_user(db, user.actor()).await?;
    Ok(role.label(&user_label, &collection))
}
