pub mod config;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod violation;

pub use config::{SeedConfig, StorageConfig};
pub use error::StorageError;
pub use sqlite::{SqliteStorage, SqliteTransaction};
pub use traits::*;
pub use violation::{ConstraintViolation, UniqueConstraint};
