//! Error types for collection, membership and role operations.
//!
//! Every operation in Roster returns [`AuthError`]. All variants are
//! caller-correctable: nothing here is fatal to the process, and nothing is
//! retried internally. Outer layers decide how to present them.

use anyhow::Error;

/// Convenience alias used across the workspace.
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Structural violation caught before anything reaches the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Constraint violation reported by the store itself.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Invalid role kind: {0:?}")]
    InvalidRoleKind(String),

    /// A device owner was passed where only a facility user is accepted.
    #[error("{0} is not a facility user")]
    UserIsNotFacilityUser(String),

    #[error("{user} is not a member of {collection}")]
    UserIsNotMember { user: String, collection: String },

    #[error("{user} does not have the {kind} role for {collection}")]
    UserDoesNotHaveRole {
        user: String,
        kind: String,
        collection: String,
    },

    #[error(
        "{user} is a member of {collection} only indirectly, through a descendant collection"
    )]
    UserIsMemberOnlyIndirectlyThroughHierarchy { user: String, collection: String },

    #[error(
        "{user} has the {kind} role for {collection} only indirectly, through an ancestor collection"
    )]
    UserHasRoleOnlyIndirectlyThroughHierarchy {
        user: String,
        kind: String,
        collection: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[source] Error),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::Database(err.into())
    }

    /// True for the two "removed at the wrong tree level" variants.
    pub fn is_indirect(&self) -> bool {
        matches!(
            self,
            Self::UserIsMemberOnlyIndirectlyThroughHierarchy { .. }
                | Self::UserHasRoleOnlyIndirectlyThroughHierarchy { .. }
        )
    }
}
