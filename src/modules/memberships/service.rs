use roster_core::{AuthError, AuthResult};
use roster_db::Store;
use roster_models::{Actor, Collection, FacilityUser, Membership, MembershipFilter};
use tracing::{debug, info, instrument};

use crate::modules::collections::service::{get_collection, get_facility, lineage};
use crate::modules::users::service::{describe_user, get_facility_user};

// ============ Queries ============

/// True when the user has a direct membership on `collection` or on any of
/// its descendants. A facility user is always a member of their own facility;
/// a device owner is never a member of anything.
#[instrument(skip(db))]
pub async fn is_member_of(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<bool> {
    let Some(user) = actor.as_facility_user() else {
        return Ok(false);
    };

    if collection.id == user.facility_id {
        return Ok(true);
    }

    let memberships = db.find_memberships(MembershipFilter::user(user.id)).await?;

    // `collection` is an ancestor-or-self of one of the directly joined nodes.
    for membership in memberships {
        if membership.collection_id == collection.id {
            return Ok(true);
        }
        let joined = get_collection(db, membership.collection_id).await?;
        if lineage(db, &joined).await?.contains(&collection.id) {
            return Ok(true);
        }
    }

    Ok(false)
}

// ============ Mutations ============

/// Ensures `collection` sits in the user's own facility.
pub(crate) async fn check_same_facility(
    db: &dyn Store,
    user: &FacilityUser,
    collection: &Collection,
) -> AuthResult<()> {
    let facility = get_facility(db, collection).await?;
    if facility.id != user.facility_id {
        return Err(AuthError::validation(format!(
            "{} is outside {}'s facility",
            collection, user.username
        )));
    }
    Ok(())
}

/// Adds a direct membership. Adding the same membership twice returns the
/// existing row.
#[instrument(skip(db))]
pub async fn add_member(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<Membership> {
    let user = actor.require_facility_user()?;
    check_same_facility(db, user, collection).await?;

    let membership = db
        .insert_membership(&Membership::new(user.id, collection.id))
        .await?;

    info!(
        user_id = %user.id,
        collection_id = %collection.id,
        membership_id = %membership.id,
        "Member added"
    );

    Ok(membership)
}

/// Adds each user in order, stopping at the first failure. Memberships added
/// before the failure are kept.
pub async fn add_members(
    db: &dyn Store,
    actors: &[Actor<'_>],
    collection: &Collection,
) -> AuthResult<Vec<Membership>> {
    let mut memberships = Vec::with_capacity(actors.len());
    for &actor in actors {
        memberships.push(add_member(db, actor, collection).await?);
    }
    Ok(memberships)
}

/// Removes the direct membership on `collection`.
///
/// Fails with `UserIsMemberOnlyIndirectlyThroughHierarchy` when the user is
/// only a member through a descendant (or through being in the facility), and
/// with `UserIsNotMember` when there is no membership at all.
#[instrument(skip(db))]
pub async fn remove_member(
    db: &dyn Store,
    actor: Actor<'_>,
    collection: &Collection,
) -> AuthResult<()> {
    let user = actor.require_facility_user()?;

    let direct = db
        .find_memberships(MembershipFilter::exact(user.id, collection.id))
        .await?;

    if !direct.is_empty() {
        for membership in &direct {
            db.delete_membership(membership.id).await?;
        }
        info!(user_id = %user.id, collection_id = %collection.id, "Member removed");
        return Ok(());
    }

    let user_label = describe_user(db, actor).await?;
    if is_member_of(db, actor, collection).await? {
        debug!(user_id = %user.id, "Membership is only inherited");
        return Err(AuthError::UserIsMemberOnlyIndirectlyThroughHierarchy {
            user: user_label,
            collection: collection.to_string(),
        });
    }

    Err(AuthError::UserIsNotMember {
        user: user_label,
        collection: collection.to_string(),
    })
}

// ============ Labels ============

/// `"foo"@"Arkham"'s membership in "Oodles of Fun" (learnergroup)`
pub async fn describe_membership(db: &dyn Store, membership: &Membership) -> AuthResult<String> {
    let user = get_facility_user(db, membership.user_id).await?;
    let collection = get_collection(db, membership.collection_id).await?;
    let user_label = describe_user(db, user.actor()).await?;
    Ok(membership.label(&user_label, &collection))
}
