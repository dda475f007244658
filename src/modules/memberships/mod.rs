//! Memberships module.
//!
//! Resolves whether a user belongs to a collection and manages the direct
//! membership rows.

pub mod service;
