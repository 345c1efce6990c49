//! Storage backends for the supplier directory.
//!
//! Every backend implements [`DirectoryStore`]. List calls load a page of
//! parents and then their children in one batch per relation, so the number
//! of backend round trips does not depend on the page size.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, PgStoreConfig};
pub use store::DirectoryStore;
