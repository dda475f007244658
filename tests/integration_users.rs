mod common;

use common::{create_classroom, create_facility, create_user, setup};
use roster::modules::memberships::service as memberships;
use roster::modules::roles::service as roles;
use roster::modules::users::service as users;
use roster::state::AppState;
use roster_core::AuthError;
use roster_models::{
    CollectionFilter, CollectionId, DeviceOwnerId, FacilityUserId, MembershipFilter,
    NewDeviceOwner, NewFacilityUser, RoleKind,
};

// ============ Facility users ============

#[tokio::test]
async fn test_create_and_get_facility_user() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;

    let user = users::create_facility_user(db, NewFacilityUser::new("foo", &facility))
        .await
        .unwrap();

    assert_eq!(user.facility_id, facility.id);
    assert_eq!(users::get_facility_user(db, user.id).await.unwrap(), user);
}

#[tokio::test]
async fn test_username_is_unique_within_a_facility() {
    let state = AppState::in_memory();
    let db = state.store();
    let arkham = create_facility(db, "Arkham").await;
    let gotham = create_facility(db, "Gotham").await;
    create_user(db, "foo", &arkham).await;

    let result = users::create_facility_user(db, NewFacilityUser::new("foo", &arkham)).await;
    assert!(matches!(result, Err(AuthError::Integrity(_))));

    // The same name in another facility is fine.
    assert!(
        users::create_facility_user(db, NewFacilityUser::new("foo", &gotham))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_facility_user_must_belong_to_a_facility() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;
    let classroom = create_classroom(db, "Classroom X", &facility).await;

    let result = users::create_facility_user(db, NewFacilityUser::new("foo", &classroom)).await;
    assert!(matches!(result, Err(AuthError::Validation(_))));

    let dto = NewFacilityUser {
        username: "foo".to_string(),
        facility_id: CollectionId::new(),
    };
    let result = users::create_facility_user(db, dto).await;
    assert!(matches!(result, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn test_invalid_username_is_rejected() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;

    let dto = NewFacilityUser::new("no spaces", &facility);
    let result = users::create_facility_user(db, dto).await;
    assert!(matches!(result, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn test_delete_facility_user() {
    let f = setup().await;
    let db = f.db();

    users::delete_facility_user(db, f.learner.id).await.unwrap();

    assert!(matches!(
        users::get_facility_user(db, f.learner.id).await,
        Err(AuthError::NotFound(_))
    ));
    assert_eq!(
        db.find_memberships(MembershipFilter::user(f.learner.id))
            .await
            .unwrap()
            .len(),
        0
    );
    // The tree itself is untouched.
    assert_eq!(
        db.list_collections(CollectionFilter::default())
            .await
            .unwrap()
            .len(),
        3
    );

    let result = users::delete_facility_user(db, f.learner.id).await;
    assert!(matches!(result, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_unknown_facility_user() {
    let f = setup().await;

    assert!(matches!(
        users::get_facility_user(f.db(), FacilityUserId::new()).await,
        Err(AuthError::NotFound(_))
    ));
}

// ============ Device owners ============

#[tokio::test]
async fn test_device_owner_lifecycle() {
    let state = AppState::in_memory();
    let db = state.store();

    let owner = users::create_device_owner(db, NewDeviceOwner::new("blah"))
        .await
        .unwrap();
    assert_eq!(users::get_device_owner(db, owner.id).await.unwrap(), owner);

    let duplicate = users::create_device_owner(db, NewDeviceOwner::new("blah")).await;
    assert!(matches!(duplicate, Err(AuthError::Integrity(_))));

    users::delete_device_owner(db, owner.id).await.unwrap();
    assert!(matches!(
        users::get_device_owner(db, owner.id).await,
        Err(AuthError::NotFound(_))
    ));
    assert!(matches!(
        users::delete_device_owner(db, DeviceOwnerId::new()).await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_device_owner_outside_every_facility() {
    let f = setup().await;
    let db = f.db();
    let owner = f.device_owner.actor();

    assert!(
        !memberships::is_member_of(db, owner, &f.facility)
            .await
            .unwrap()
    );
    assert!(
        roles::has_role_for_user(db, owner, RoleKind::Admin, f.facility_admin.actor())
            .await
            .unwrap()
    );
}
