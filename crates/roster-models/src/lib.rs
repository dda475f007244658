//! # Roster Models
//!
//! Domain models and DTOs for Roster.
//!
//! # Modules
//!
//! - [`collections`]: the collection tree (facility, classroom, learner group)
//! - [`ids`]: strongly-typed UUID identifiers
//! - [`memberships`]: direct membership rows
//! - [`roles`]: direct role rows and role kinds
//! - [`users`]: facility users, device owners and the [`Actor`] view over both
//!
//! # Example
//!
//! ```ignore
//! use roster_models::{NewCollection, NewFacilityUser};
//!
//! let facility = NewCollection::facility("Arkham").into_collection(None)?;
//! let user = NewFacilityUser::new("foo", &facility).into_user(&facility)?;
//! assert_eq!(user.label(&facility), r#""foo"@"Arkham""#);
//! ```

pub mod collections;
pub mod ids;
pub mod memberships;
pub mod roles;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use collections::{Collection, CollectionFilter, CollectionKind, NewCollection};
pub use ids::{CollectionId, DeviceOwnerId, FacilityUserId, MembershipId, RoleId};
pub use memberships::{Membership, MembershipFilter};
pub use roles::{Role, RoleFilter, RoleKind};
pub use users::{Actor, DeviceOwner, FacilityUser, NewDeviceOwner, NewFacilityUser};
