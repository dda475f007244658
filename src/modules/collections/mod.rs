//! Collections module.
//!
//! Creation, navigation and deletion of the facility / classroom / learner
//! group tree.

pub mod service;
