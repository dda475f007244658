use roster::modules::{collections, memberships, roles, users};
use roster::state::AppState;
use roster_db::Store;
use roster_models::{
    Collection, DeviceOwner, FacilityUser, MembershipFilter, NewCollection, NewDeviceOwner,
    NewFacilityUser, RoleFilter, RoleKind,
};

/// The tree most tests start from:
///
/// ```text
/// "Arkham" (facility)                 baz: admin
///   └── "Classroom X" (classroom)     bar: coach
///         └── "Oodles of Fun"         foo: member
/// ```
///
/// plus the device owner `blah`.
#[allow(dead_code)]
pub struct Fixture {
    pub state: AppState,
    pub facility: Collection,
    pub classroom: Collection,
    pub learner_group: Collection,
    pub learner: FacilityUser,
    pub classroom_coach: FacilityUser,
    pub facility_admin: FacilityUser,
    pub device_owner: DeviceOwner,
}

impl Fixture {
    pub fn db(&self) -> &dyn Store {
        self.state.store()
    }
}

pub async fn setup() -> Fixture {
    let state = AppState::in_memory();
    let db = state.store();

    let facility = create_facility(db, "Arkham").await;
    let learner = create_user(db, "foo", &facility).await;
    let classroom_coach = create_user(db, "bar", &facility).await;
    let facility_admin = create_user(db, "baz", &facility).await;

    roles::service::add_admin(db, facility_admin.actor(), &facility)
        .await
        .unwrap();

    let classroom = create_classroom(db, "Classroom X", &facility).await;
    roles::service::add_coach(db, classroom_coach.actor(), &classroom)
        .await
        .unwrap();

    let learner_group = create_learner_group(db, "Oodles of Fun", &classroom).await;
    memberships::service::add_member(db, learner.actor(), &learner_group)
        .await
        .unwrap();

    let device_owner = create_device_owner(db, "blah").await;

    Fixture {
        state,
        facility,
        classroom,
        learner_group,
        learner,
        classroom_coach,
        facility_admin,
        device_owner,
    }
}

#[allow(dead_code)]
pub async fn create_facility(db: &dyn Store, name: &str) -> Collection {
    collections::service::create_collection(db, NewCollection::facility(name))
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn create_classroom(db: &dyn Store, name: &str, facility: &Collection) -> Collection {
    collections::service::create_collection(db, NewCollection::classroom(name, facility))
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn create_learner_group(
    db: &dyn Store,
    name: &str,
    classroom: &Collection,
) -> Collection {
    collections::service::create_collection(db, NewCollection::learner_group(name, classroom))
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn create_user(db: &dyn Store, username: &str, facility: &Collection) -> FacilityUser {
    users::service::create_facility_user(db, NewFacilityUser::new(username, facility))
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn create_device_owner(db: &dyn Store, username: &str) -> DeviceOwner {
    users::service::create_device_owner(db, NewDeviceOwner::new(username))
        .await
        .unwrap()
}

/// Number of direct role rows matching the filter.
#[allow(dead_code)]
pub async fn count_roles(db: &dyn Store, filter: RoleFilter) -> usize {
    db.find_roles(filter).await.unwrap().len()
}

#[allow(dead_code)]
pub async fn count_direct_roles(
    db: &dyn Store,
    user: &FacilityUser,
    kind: RoleKind,
    collection: &Collection,
) -> usize {
    count_roles(db, RoleFilter::exact(user.id, collection.id, kind)).await
}

/// Number of direct membership rows matching the filter.
#[allow(dead_code)]
pub async fn count_memberships(db: &dyn Store, filter: MembershipFilter) -> usize {
    db.find_memberships(filter).await.unwrap().len()
}
