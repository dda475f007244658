use roster_core::{AuthError, AuthResult};
use roster_db::Store;
use roster_models::{
    Actor, DeviceOwner, DeviceOwnerId, FacilityUser, FacilityUserId, NewDeviceOwner,
    NewFacilityUser,
};
use tracing::{info, instrument};

// ============ Facility users ============

#[instrument(skip(db))]
pub async fn create_facility_user(
    db: &dyn Store,
    new: NewFacilityUser,
) -> AuthResult<FacilityUser> {
    let facility = db.get_collection(new.facility_id).await?.ok_or_else(|| {
        AuthError::validation(format!("facility {} does not exist", new.facility_id))
    })?;

    let user = new.into_user(&facility)?;
    db.insert_facility_user(&user).await?;

    info!(user_id = %user.id, facility_id = %facility.id, "Facility user created");

    Ok(user)
}

#[instrument(skip(db))]
pub async fn get_facility_user(db: &dyn Store, id: FacilityUserId) -> AuthResult<FacilityUser> {
    db.get_facility_user(id)
        .await?
        .ok_or_else(|| AuthError::not_found(format!("Facility user {}", id)))
}

/// Deletes the user together with their memberships and roles.
#[instrument(skip(db))]
pub async fn delete_facility_user(db: &dyn Store, id: FacilityUserId) -> AuthResult<()> {
    if !db.delete_facility_user(id).await? {
        return Err(AuthError::not_found(format!("Facility user {}", id)));
    }

    info!(user_id = %id, "Facility user deleted");
    Ok(())
}

// ============ Device owners ============

#[instrument(skip(db))]
pub async fn create_device_owner(db: &dyn Store, new: NewDeviceOwner) -> AuthResult<DeviceOwner> {
    let owner = new.into_owner()?;
    db.insert_device_owner(&owner).await?;

    info!(owner_id = %owner.id, "Device owner created");

    Ok(owner)
}

#[instrument(skip(db))]
pub async fn get_device_owner(db: &dyn Store, id: DeviceOwnerId) -> AuthResult<DeviceOwner> {
    db.get_device_owner(id)
        .await?
        .ok_or_else(|| AuthError::not_found(format!("Device owner {}", id)))
}

#[instrument(skip(db))]
pub async fn delete_device_owner(db: &dyn Store, id: DeviceOwnerId) -> AuthResult<()> {
    if !db.delete_device_owner(id).await? {
        return Err(AuthError::not_found(format!("Device owner {}", id)));
    }

    info!(owner_id = %id, "Device owner deleted");
    Ok(())
}

// ============ Labels ============

/// `"foo"@"Arkham"` for a facility user, the bare username for a device owner.
pub async fn describe_user(db: &dyn Store, actor: Actor<'_>) -> AuthResult<String> {
    match actor {
        Actor::FacilityUser(user) => {
            let facility = db.get_collection(user.facility_id).await?.ok_or_else(|| {
                AuthError::integrity(format!(
                    "user {} points at missing facility {}",
                    user.id, user.facility_id
                ))
            })?;
            Ok(user.label(&facility))
        }
        Actor::DeviceOwner(owner) => Ok(owner.to_string()),
    }
}
