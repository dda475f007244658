//! Users module.
//!
//! Facility users and device owners, plus the display label shared by the
//! membership and role error messages.

pub mod service;
