//! # Roster Config
//!
//! Configuration types for Roster, loaded from environment variables.
//!
//! - [`store`]: which persistence backend to use, and how to reach Postgres
//! - [`logging`]: console logging level and format
//!
//! # Example
//!
//! ```ignore
//! use roster_config::{LoggingConfig, StoreConfig};
//!
//! roster_config::load_dotenv();
//! let store_config = StoreConfig::from_env();
//! let logging_config = LoggingConfig::from_env();
//! ```

pub mod logging;
pub mod store;

// Re-export commonly used types at crate root
pub use logging::{LogFormat, LoggingConfig};
pub use store::{DatabaseConfig, StoreBackend, StoreConfig};

/// Loads a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}
