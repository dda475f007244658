use std::collections::{HashSet, VecDeque};

use roster_core::{AuthError, AuthResult};
use roster_db::Store;
use roster_models::{
    Collection, CollectionFilter, CollectionId, CollectionKind, FacilityUser, MembershipFilter,
    NewCollection,
};
use tracing::{debug, info, instrument};

// ============ Creation & lookup ============

/// Validates `new` against its parent and stores it.
///
/// A dangling `parent_id` is reported as a validation error; the store would
/// otherwise reject it as an integrity error.
#[instrument(skip(db))]
pub async fn create_collection(db: &dyn Store, new: NewCollection) -> AuthResult<Collection> {
    let parent = match new.parent_id {
        Some(parent_id) => {
            let parent = db.get_collection(parent_id).await?.ok_or_else(|| {
                AuthError::validation(format!("parent collection {} does not exist", parent_id))
            })?;
            Some(parent)
        }
        None => None,
    };

    let collection = new.into_collection(parent.as_ref())?;
    db.insert_collection(&collection).await?;

    info!(collection_id = %collection.id, kind = %collection.kind, "Collection created");

    Ok(collection)
}

#[instrument(skip(db))]
pub async fn get_collection(db: &dyn Store, id: CollectionId) -> AuthResult<Collection> {
    db.get_collection(id)
        .await?
        .ok_or_else(|| AuthError::not_found(format!("Collection {}", id)))
}

/// Fetches a parent that the child row claims exists.
async fn fetch_parent(
    db: &dyn Store,
    child: &Collection,
    id: CollectionId,
) -> AuthResult<Collection> {
    db.get_collection(id).await?.ok_or_else(|| {
        AuthError::integrity(format!(
            "collection {} points at missing parent {}",
            child.id, id
        ))
    })
}

pub async fn get_parent(db: &dyn Store, collection: &Collection) -> AuthResult<Option<Collection>> {
    match collection.parent_id {
        Some(id) => fetch_parent(db, collection, id).await.map(Some),
        None => Ok(None),
    }
}

// ============ Tree walks ============

/// Ancestors nearest-first, ending at the facility. Empty for a facility.
#[instrument(skip_all, fields(collection_id = %collection.id))]
pub async fn get_ancestors(db: &dyn Store, collection: &Collection) -> AuthResult<Vec<Collection>> {
    let mut ancestors: Vec<Collection> = Vec::new();
    let mut next = collection.parent_id;

    while let Some(id) = next {
        // The tree is at most as deep as there are kinds.
        if ancestors.len() >= CollectionKind::ALL.len() {
            return Err(AuthError::integrity(format!(
                "cycle in the ancestry of collection {}",
                collection.id
            )));
        }
        let child = ancestors.last().unwrap_or(collection);
        let parent = fetch_parent(db, child, id).await?;
        next = parent.parent_id;
        ancestors.push(parent);
    }

    Ok(ancestors)
}

/// `collection` itself followed by its ancestors' IDs.
pub(crate) async fn lineage(
    db: &dyn Store,
    collection: &Collection,
) -> AuthResult<Vec<CollectionId>> {
    let mut ids = vec![collection.id];
    let ancestors = get_ancestors(db, collection).await?;
    ids.extend(ancestors.iter().map(|c| c.id));
    Ok(ids)
}

/// Every collection below `collection`, breadth-first.
#[instrument(skip_all, fields(collection_id = %collection.id))]
pub async fn get_descendants(
    db: &dyn Store,
    collection: &Collection,
) -> AuthResult<Vec<Collection>> {
    let mut descendants = Vec::new();
    let mut queue = VecDeque::from([collection.id]);

    while let Some(parent_id) = queue.pop_front() {
        let children = db
            .list_collections(CollectionFilter::children_of(parent_id))
            .await?;
        queue.extend(children.iter().map(|c| c.id));
        descendants.extend(children);
    }

    Ok(descendants)
}

pub async fn get_descendants_by_kind(
    db: &dyn Store,
    collection: &Collection,
    kind: CollectionKind,
) -> AuthResult<Vec<Collection>> {
    let mut descendants = get_descendants(db, collection).await?;
    descendants.retain(|c| c.kind == kind);
    Ok(descendants)
}

/// The facility at the root of `collection`'s tree. A facility is its own.
pub async fn get_facility(db: &dyn Store, collection: &Collection) -> AuthResult<Collection> {
    if collection.is_facility() {
        return Ok(collection.clone());
    }

    get_ancestors(db, collection)
        .await?
        .pop()
        .filter(Collection::is_facility)
        .ok_or_else(|| {
            AuthError::integrity(format!(
                "collection {} is not rooted at a facility",
                collection.id
            ))
        })
}

// ============ Kind-specific navigation ============

fn expect_kind(collection: &Collection, kind: CollectionKind) -> AuthResult<()> {
    if collection.kind == kind {
        Ok(())
    } else {
        Err(AuthError::validation(format!(
            "{} is not a {}",
            collection, kind
        )))
    }
}

pub async fn get_classrooms(db: &dyn Store, facility: &Collection) -> AuthResult<Vec<Collection>> {
    expect_kind(facility, CollectionKind::Facility)?;
    db.list_collections(CollectionFilter {
        kind: Some(CollectionKind::Classroom),
        parent_id: Some(facility.id),
    })
    .await
}

pub async fn get_learner_groups(
    db: &dyn Store,
    classroom: &Collection,
) -> AuthResult<Vec<Collection>> {
    expect_kind(classroom, CollectionKind::Classroom)?;
    db.list_collections(CollectionFilter {
        kind: Some(CollectionKind::LearnerGroup),
        parent_id: Some(classroom.id),
    })
    .await
}

pub async fn get_classroom(db: &dyn Store, learner_group: &Collection) -> AuthResult<Collection> {
    expect_kind(learner_group, CollectionKind::LearnerGroup)?;
    get_parent(db, learner_group).await?.ok_or_else(|| {
        AuthError::integrity(format!(
            "learner group {} has no classroom",
            learner_group.id
        ))
    })
}

/// Every facility user that is a member of `collection`, directly or through
/// a descendant. For a facility that is all of its users.
#[instrument(skip_all, fields(collection_id = %collection.id))]
pub async fn get_members(db: &dyn Store, collection: &Collection) -> AuthResult<Vec<FacilityUser>> {
    let facility = get_facility(db, collection).await?;
    let users = db.list_facility_users(facility.id).await?;

    if collection.is_facility() {
        return Ok(users);
    }

    let mut subtree = vec![collection.id];
    let descendants = get_descendants(db, collection).await?;
    subtree.extend(descendants.iter().map(|c| c.id));

    let mut member_ids = HashSet::new();
    for collection_id in subtree {
        let memberships = db
            .find_memberships(MembershipFilter::collection(collection_id))
            .await?;
        member_ids.extend(memberships.into_iter().map(|m| m.user_id));
    }

    debug!(members = member_ids.len(), "Resolved collection members");

    Ok(users
        .into_iter()
        .filter(|user| member_ids.contains(&user.id))
        .collect())
}

// ============ Deletion ============

/// Deletes `collection` and everything below it in one atomic step, along
/// with every membership and role on the removed collections. Deleting a
/// facility also deletes its users.
#[instrument(skip(db))]
pub async fn delete_collection(db: &dyn Store, id: CollectionId) -> AuthResult<Vec<CollectionId>> {
    let removed = db.delete_collection_tree(id).await?;

    if removed.is_empty() {
        return Err(AuthError::not_found(format!("Collection {}", id)));
    }

    info!(
        collection_id = %id,
        removed = removed.len(),
        "Collection subtree deleted"
    );

    Ok(removed)
}
