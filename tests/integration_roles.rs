mod common;

use std::collections::BTreeSet;

use common::{
    count_direct_roles, count_roles, create_classroom, create_device_owner, create_facility,
    create_learner_group, create_user, setup,
};
use roster::modules::roles::service as roles;
use roster::modules::users::service as users;
use roster::state::AppState;
use roster_core::AuthError;
use roster_models::{Actor, RoleFilter, RoleKind};

// ============ Resolution ============

#[tokio::test]
async fn test_coach_role_flows_down_not_up() {
    let f = setup().await;
    let db = f.db();
    let coach = f.classroom_coach.actor();

    assert!(
        roles::has_role_for_collection(db, coach, RoleKind::Coach, &f.learner_group)
            .await
            .unwrap()
    );
    assert!(
        roles::has_role_for_collection(db, coach, RoleKind::Coach, &f.classroom)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_collection(db, coach, RoleKind::Coach, &f.facility)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_collection(db, coach, RoleKind::Admin, &f.learner_group)
            .await
            .unwrap()
    );

    assert!(
        roles::has_role_for_user(db, coach, RoleKind::Coach, f.learner.actor())
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_user(db, coach, RoleKind::Coach, f.facility_admin.actor())
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_user(db, coach, RoleKind::Admin, f.learner.actor())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_facility_admin_governs_the_whole_facility() {
    let f = setup().await;
    let db = f.db();
    let admin = f.facility_admin.actor();

    for collection in [&f.facility, &f.classroom, &f.learner_group] {
        assert!(
            roles::has_role_for_collection(db, admin, RoleKind::Admin, collection)
                .await
                .unwrap()
        );
    }
    assert!(
        !roles::has_role_for_collection(db, admin, RoleKind::Coach, &f.learner_group)
            .await
            .unwrap()
    );

    for target in [&f.learner, &f.facility_admin, &f.classroom_coach] {
        assert!(
            roles::has_role_for_user(db, admin, RoleKind::Admin, target.actor())
                .await
                .unwrap()
        );
    }
    assert!(
        !roles::has_role_for_user(db, admin, RoleKind::Coach, f.learner.actor())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_no_implicit_role_over_oneself() {
    let f = setup().await;
    let learner = f.learner.actor();

    let held = roles::get_roles_for_user(f.db(), learner, learner)
        .await
        .unwrap();
    assert!(held.is_empty());
}

#[tokio::test]
async fn test_facility_users_never_govern_device_owners() {
    let f = setup().await;

    let held = roles::get_roles_for_user(f.db(), f.facility_admin.actor(), f.device_owner.actor())
        .await
        .unwrap();
    assert!(held.is_empty());
}

#[tokio::test]
async fn test_roles_do_not_cross_facilities() {
    let f = setup().await;
    let db = f.db();
    let other = create_facility(db, "Gotham").await;
    let stranger = create_user(db, "joker", &other).await;

    let admin = f.facility_admin.actor();

    assert!(
        !roles::has_role_for_collection(db, admin, RoleKind::Admin, &other)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_user(db, admin, RoleKind::Admin, stranger.actor())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_get_roles_for_collection() {
    let f = setup().await;
    let db = f.db();
    roles::add_admin(db, f.classroom_coach.actor(), &f.learner_group)
        .await
        .unwrap();

    let held = roles::get_roles_for_collection(db, f.classroom_coach.actor(), &f.learner_group)
        .await
        .unwrap();
    assert_eq!(held, BTreeSet::from([RoleKind::Admin, RoleKind::Coach]));

    let held = roles::get_roles_for_collection(db, f.classroom_coach.actor(), &f.classroom)
        .await
        .unwrap();
    assert_eq!(held, BTreeSet::from([RoleKind::Coach]));
}

#[tokio::test]
async fn test_has_any_role() {
    let f = setup().await;
    let db = f.db();
    let coach = f.classroom_coach.actor();
    let both = [RoleKind::Admin, RoleKind::Coach];

    assert!(
        roles::has_any_role_for_collection(db, coach, &both, &f.learner_group)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_any_role_for_collection(db, coach, &[RoleKind::Admin], &f.learner_group)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_any_role_for_collection(db, coach, &[], &f.learner_group)
            .await
            .unwrap()
    );

    assert!(
        roles::has_any_role_for_user(db, coach, &both, f.learner.actor())
            .await
            .unwrap()
    );
    assert!(
        !roles::has_any_role_for_user(db, coach, &both, f.facility_admin.actor())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_get_role_holders() {
    let f = setup().await;
    let db = f.db();
    let second_coach = create_user(db, "aaa", &f.facility).await;
    roles::add_coach(db, second_coach.actor(), &f.learner_group)
        .await
        .unwrap();

    let coaches = roles::get_role_holders(db, &f.learner_group, RoleKind::Coach)
        .await
        .unwrap();
    let names: Vec<&str> = coaches.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["aaa", "bar"]);

    let coaches = roles::get_role_holders(db, &f.classroom, RoleKind::Coach)
        .await
        .unwrap();
    let names: Vec<&str> = coaches.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["bar"]);

    let admins = roles::get_role_holders(db, &f.learner_group, RoleKind::Admin)
        .await
        .unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].id, f.facility_admin.id);
}

// ============ Removal ============

#[tokio::test]
async fn test_remove_coach() {
    let f = setup().await;
    let db = f.db();
    let coach = f.classroom_coach.actor();
    assert_eq!(
        count_direct_roles(db, &f.classroom_coach, RoleKind::Coach, &f.classroom).await,
        1
    );

    roles::remove_coach(db, coach, &f.classroom).await.unwrap();

    for collection in [&f.learner_group, &f.classroom, &f.facility] {
        assert!(
            !roles::has_role_for_collection(db, coach, RoleKind::Coach, collection)
                .await
                .unwrap()
        );
    }
    assert!(
        !roles::has_role_for_user(db, coach, RoleKind::Coach, f.learner.actor())
            .await
            .unwrap()
    );
    assert_eq!(
        count_direct_roles(db, &f.classroom_coach, RoleKind::Coach, &f.classroom).await,
        0
    );

    let result = roles::remove_coach(db, coach, &f.classroom).await;
    assert!(matches!(result, Err(AuthError::UserDoesNotHaveRole { .. })));
}

#[tokio::test]
async fn test_remove_admin() {
    let f = setup().await;
    let db = f.db();
    let admin = f.facility_admin.actor();

    roles::remove_admin(db, admin, &f.facility).await.unwrap();

    assert_eq!(
        count_direct_roles(db, &f.facility_admin, RoleKind::Admin, &f.facility).await,
        0
    );
    assert!(
        !roles::has_role_for_user(db, admin, RoleKind::Admin, f.learner.actor())
            .await
            .unwrap()
    );

    let result = roles::remove_admin(db, admin, &f.facility).await;
    assert!(matches!(result, Err(AuthError::UserDoesNotHaveRole { .. })));
}

#[tokio::test]
async fn test_remove_nonexistent_role() {
    let f = setup().await;
    let db = f.db();

    let result = roles::remove_admin(db, f.learner.actor(), &f.facility).await;
    match result {
        Err(AuthError::UserDoesNotHaveRole { user, kind, collection }) => {
            assert_eq!(user, r#""foo"@"Arkham""#);
            assert_eq!(kind, "admin");
            assert_eq!(collection, r#""Arkham" (facility)"#);
        }
        other => panic!("expected UserDoesNotHaveRole, got {:?}", other),
    }

    let result = roles::remove_coach(db, f.learner.actor(), &f.classroom).await;
    assert!(matches!(result, Err(AuthError::UserDoesNotHaveRole { .. })));
}

#[tokio::test]
async fn test_remove_indirect_admin_role() {
    let f = setup().await;
    let db = f.db();

    let result = roles::remove_admin(db, f.facility_admin.actor(), &f.classroom).await;
    assert!(matches!(
        result,
        Err(AuthError::UserHasRoleOnlyIndirectlyThroughHierarchy { .. })
    ));

    // The facility role is still there.
    assert_eq!(
        count_direct_roles(db, &f.facility_admin, RoleKind::Admin, &f.facility).await,
        1
    );
}

// ============ Granting ============

#[tokio::test]
async fn test_add_and_remove_admin() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;
    let classroom = create_classroom(db, "Classroom X", &facility).await;
    let user = create_user(db, "foo", &facility).await;

    roles::add_admin(db, user.actor(), &classroom)

        .await

        .unwrap();
    roles::add_admin(db, user.actor(), &facility).await.unwrap();
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Admin, &classroom).await,
        1
    );
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Admin, &facility).await,
        1
    );

    // Both rows are direct, so both can be removed.
    roles::remove_admin(db, user.actor(), &classroom)
        .await
        .unwrap();
    roles::remove_admin(db, user.actor(), &facility)
        .await
        .unwrap();
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Admin, &classroom).await,
        0
    );
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Admin, &facility).await,
        0
    );
}

#[tokio::test]
async fn test_add_and_remove_coach() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;
    let classroom = create_classroom(db, "Classroom X", &facility).await;
    let user = create_user(db, "foo", &facility).await;

    roles::add_coach(db, user.actor(), &classroom)

        .await

        .unwrap();
    roles::add_coach(db, user.actor(), &facility).await.unwrap();
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Coach, &classroom).await,
        1
    );
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Coach, &facility).await,
        1
    );

    roles::remove_coach(db, user.actor(), &classroom)

        .await

        .unwrap();
    roles::remove_coach(db, user.actor(), &facility)
        .await
        .unwrap();
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Coach, &classroom).await,
        0
    );
    assert_eq!(
        count_direct_roles(db, &user, RoleKind::Coach, &facility).await,
        0
    );
}

#[tokio::test]
async fn test_add_role_is_idempotent() {
    let f = setup().await;
    let db = f.db();

    let first = roles::add_role(db, f.classroom_coach.actor(), "coach", &f.classroom)
        .await
        .unwrap();
    assert_eq!(
        count_direct_roles(db, &f.classroom_coach, RoleKind::Coach, &f.classroom).await,
        1
    );

    let second = roles::add_coach(db, f.classroom_coach.actor(), &f.classroom)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_add_coaches_and_admins() {
    let state = AppState::in_memory();
    let db = state.store();
    let facility = create_facility(db, "Arkham").await;
    let classroom = create_classroom(db, "Classroom X", &facility).await;
    let user1 = create_user(db, "foo1", &facility).await;
    let user2 = create_user(db, "foo2", &facility).await;
    let actors = [user1.actor(), user2.actor()];

    roles::add_coaches(db, &actors, &classroom).await.unwrap();
    roles::add_coaches(db, &actors, &facility).await.unwrap();
    roles::add_admins(db, &actors, &classroom).await.unwrap();
    let granted = roles::add_admins(db, &actors, &facility).await.unwrap();
    assert_eq!(granted.len(), 2);

    for collection in [&classroom, &facility] {
        for kind in RoleKind::ALL {
            let filter = RoleFilter::collection(collection.id).with_kind(kind);
            assert_eq!(count_roles(db, filter).await, 2);
        }
    }
}

#[tokio::test]
async fn test_add_admins_stops_at_first_failure() {
    let f = setup().await;
    let db = f.db();
    let other = create_facility(db, "Gotham").await;
    let outsider = create_user(db, "joker", &other).await;
    let actors: Vec<Actor<'_>> = vec![
        f.learner.actor(),
        outsider.actor(),
        f.classroom_coach.actor(),
    ];

    let result = roles::add_admins(db, &actors, &f.learner_group).await;
    assert!(matches!(result, Err(AuthError::Validation(_))));

    let rows = db
        .find_roles(RoleFilter::collection(f.learner_group.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, f.learner.id);
}

#[tokio::test]
async fn test_add_role_outside_own_facility() {
    let f = setup().await;
    let db = f.db();
    let other = create_facility(db, "Gotham").await;
    let lair = create_classroom(db, "Lair", &other).await;
    let other_group = create_learner_group(db, "Henchmen", &lair).await;

    for collection in [&other, &other_group] {
        let result = roles::add_admin(db, f.facility_admin.actor(), collection).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }
}

#[tokio::test]
async fn test_invalid_role_kind() {
    let f = setup().await;
    let db = f.db();
    let user = f.learner.actor();

    let bogus = "blahblahnonexistentroletype";

    let result = roles::add_role(db, user, bogus, &f.learner_group).await;
    match result {
        Err(AuthError::InvalidRoleKind(kind)) => assert_eq!(kind, bogus),
        other => panic!("expected InvalidRoleKind, got {:?}", other),
    }

    let result = roles::remove_role(db, user, bogus, &f.learner_group).await;
    assert!(matches!(result, Err(AuthError::InvalidRoleKind(_))));

    // The kind is checked before the account type.
    let owner = f.device_owner.actor();
    let result = roles::add_role(db, owner, "blahblahnonexistentroletype", &f.learner_group).await;
    assert!(matches!(result, Err(AuthError::InvalidRoleKind(_))));
}

// ============ Device owners ============

#[tokio::test]
async fn test_device_owner_is_admin_for_everything() {
    let f = setup().await;
    let db = f.db();
    let owner = f.device_owner.actor();
    let other_owner = create_device_owner(db, "bleeh").await;
    let admin_only = BTreeSet::from([RoleKind::Admin]);

    for collection in [&f.classroom, &f.facility] {
        assert_eq!(
            roles::get_roles_for_collection(db, owner, collection)
                .await
                .unwrap(),
            admin_only
        );
    }
    for target in [f.learner.actor(), owner, other_owner.actor()] {
        assert_eq!(
            roles::get_roles_for_user(db, owner, target).await.unwrap(),
            admin_only
        );
    }

    assert!(
        roles::has_any_role_for_user(db, owner, &[RoleKind::Admin], f.learner.actor())
            .await
            .unwrap()
    );
    assert!(
        roles::has_any_role_for_collection(db, owner, &[RoleKind::Admin], &f.facility)
            .await
            .unwrap()
    );
    assert!(
        !roles::has_role_for_collection(db, owner, RoleKind::Coach, &f.facility)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_device_owners_cannot_be_assigned_or_removed_from_roles() {
    let f = setup().await;
    let db = f.db();
    let owner = f.device_owner.actor();

    let result = roles::add_admin(db, owner, &f.classroom).await;
    assert!(matches!(result, Err(AuthError::UserIsNotFacilityUser(_))));

    let result = roles::remove_admin(db, owner, &f.classroom).await;
    assert!(matches!(result, Err(AuthError::UserIsNotFacilityUser(_))));
}

// ============ Cascades ============

#[tokio::test]
async fn test_delete_facility_user_deletes_roles() {
    let f = setup().await;
    let db = f.db();

    users::delete_facility_user(db, f.classroom_coach.id)
        .await
        .unwrap();

    assert_eq!(
        count_roles(db, RoleFilter::collection(f.classroom.id)).await,
        0
    );
    assert_eq!(
        count_roles(db, RoleFilter::collection(f.facility.id)).await,
        1
    );
}
