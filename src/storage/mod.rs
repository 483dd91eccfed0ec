//! File-backed storage and the named handlers serving it.

pub mod handlers;
pub mod persistence;

pub use handlers::file_storage_handlers;
pub use persistence::{FilePersistence, JsonWrite, StorageError};
