//! # Roster Core
//!
//! Core types, errors, and utilities shared by the Roster crates.
//!
//! - [`errors`]: the [`AuthError`] enum returned by every collection, membership
//!   and role operation
//! - [`validation`]: conversion of `validator` failures into [`AuthError::Validation`]
//!
//! # Example
//!
//! ```ignore
//! use roster_core::errors::AuthError;
//!
//! fn check(kind: &str) -> Result<(), AuthError> {
//!     Err(AuthError::InvalidRoleKind(kind.to_string()))
//! }
//! ```

pub mod errors;
pub mod validation;

// Re-export commonly used types at crate root
pub use errors::{AuthError, AuthResult};
pub use validation::{format_errors, validate_dto};
