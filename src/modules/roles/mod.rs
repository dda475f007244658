//! Roles module.
//!
//! Resolves which roles a user holds over a collection or over another user,
//! and grants or revokes direct roles.

pub mod service;
