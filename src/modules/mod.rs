pub mod collections;
pub mod memberships;
pub mod roles;
pub mod users;
