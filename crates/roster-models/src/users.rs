//! User models.
//!
//! There are two kinds of account. A [`FacilityUser`] belongs to exactly one
//! facility and takes part in the collection tree through memberships and
//! roles. A [`DeviceOwner`] sits outside the tree and is implicitly an admin
//! of everything.
//!
//! Resolver operations accept an [`Actor`], which borrows either kind of
//! account and lets the resolvers dispatch on the variant.

use crate::collections::Collection;
use crate::ids::{CollectionId, DeviceOwnerId, FacilityUserId};
use chrono::{DateTime, Utc};
use roster_core::{AuthError, AuthResult, validate_dto};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// A user scoped to a single facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityUser {
    pub id: FacilityUserId,
    pub username: String,
    pub facility_id: CollectionId,
    pub date_joined: DateTime<Utc>,
}

impl FacilityUser {
    #[inline]
    pub fn actor(&self) -> Actor<'_> {
        Actor::FacilityUser(self)
    }

    /// `"foo"@"Arkham"`, given the user's facility.
    pub fn label(&self, facility: &Collection) -> String {
        format!("\"{}\"@\"{}\"", self.username, facility.name)
    }
}

/// A device-level super user. Never a member of any collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOwner {
    pub id: DeviceOwnerId,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

impl DeviceOwner {
    #[inline]
    pub fn actor(&self) -> Actor<'_> {
        Actor::DeviceOwner(self)
    }
}

impl fmt::Display for DeviceOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// Borrowed view of either account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor<'a> {
    FacilityUser(&'a FacilityUser),
    DeviceOwner(&'a DeviceOwner),
}

impl<'a> Actor<'a> {
    pub fn username(&self) -> &'a str {
        match *self {
            Self::FacilityUser(user) => &user.username,
            Self::DeviceOwner(owner) => &owner.username,
        }
    }

    #[inline]
    pub fn is_device_owner(&self) -> bool {
        matches!(self, Self::DeviceOwner(_))
    }

    pub fn as_facility_user(&self) -> Option<&'a FacilityUser> {
        match *self {
            Self::FacilityUser(user) => Some(user),
            Self::DeviceOwner(_) => None,
        }
    }

    /// Unwraps the facility user or fails with `UserIsNotFacilityUser`.
    pub fn require_facility_user(&self) -> AuthResult<&'a FacilityUser> {
        self.as_facility_user()
            .ok_or_else(|| AuthError::UserIsNotFacilityUser(self.username().to_string()))
    }
}

impl<'a> From<&'a FacilityUser> for Actor<'a> {
    fn from(user: &'a FacilityUser) -> Self {
        Self::FacilityUser(user)
    }
}

impl<'a> From<&'a DeviceOwner> for Actor<'a> {
    fn from(owner: &'a DeviceOwner) -> Self {
        Self::DeviceOwner(owner)
    }
}

impl fmt::Display for Actor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.username())
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("username_characters");
        error.message =
            Some("Username may only contain letters, digits and @/./+/-/_ characters".into());
        Err(error)
    }
}

/// DTO for creating a facility user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewFacilityUser {
    #[validate(
        length(min = 1, max = 30, message = "Username must be between 1 and 30 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    pub facility_id: CollectionId,
}

impl NewFacilityUser {
    pub fn new(username: impl Into<String>, facility: &Collection) -> Self {
        Self {
            username: username.into(),
            facility_id: facility.id,
        }
    }

    /// Validates the DTO against the resolved facility.
    pub fn into_user(self, facility: &Collection) -> AuthResult<FacilityUser> {
        validate_dto(&self)?;

        if facility.id != self.facility_id {
            return Err(AuthError::validation("facility does not match facility_id"));
        }
        if !facility.is_facility() {
            return Err(AuthError::validation(format!(
                "users must belong to a facility, not a {}",
                facility.kind
            )));
        }

        Ok(FacilityUser {
            id: FacilityUserId::new(),
            username: self.username,
            facility_id: self.facility_id,
            date_joined: Utc::now(),
        })
    }
}

/// DTO for creating a device owner.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDeviceOwner {
    #[validate(
        length(min = 1, max = 30, message = "Username must be between 1 and 30 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
}

impl NewDeviceOwner {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn into_owner(self) -> AuthResult<DeviceOwner> {
        validate_dto(&self)?;

        Ok(DeviceOwner {
            id: DeviceOwnerId::new(),
            username: self.username,
            date_joined: Utc::now(),
        })
    }
}
