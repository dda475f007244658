//! # Roster DB
//!
//! The persistence collaborator for Roster.
//!
//! Every resolver and mutation talks to storage through the [`Store`] trait.
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: a process-local store guarded by a single lock; used by
//!   the test-suite and by embedders that do not need durability
//! - [`PgStore`]: PostgreSQL via SQLx, expecting the tables documented in
//!   [`postgres`] to exist already
//!
//! Both enforce the same integrity rules and both make the cascading deletes
//! atomic.
//!
//! # Example
//!
//! ```ignore
//! use roster_db::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! store.insert_collection(&facility).await?;
//! ```

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use pool::init_db_pool;
pub use postgres::PgStore;
pub use store::Store;

// Re-export PgPool for convenience
pub use sqlx::PgPool;
