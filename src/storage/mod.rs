//! Persistent state: links, suggestions, learned patterns, and the
//! boundaries to externally-owned documents and entities.

mod boundary;
pub mod migrations;
mod sqlite;

pub use boundary::{DocumentSource, EntityCatalog};
pub use migrations::{Migration, MigrationRunner, MIGRATIONS};
pub use sqlite::{SqliteStore, StoreStatus};
