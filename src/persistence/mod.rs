//! Persistence: the persisted logical format, the storage-adapter
//! collaborator interface, and the scheduling/hold-off/worker-thread
//! machinery that drives it (spec §4.4, §6).

pub mod adapter;
pub mod format;
pub mod scheduler;

pub use adapter::{FileStorageAdapter, StorageAdapter};
pub use format::{FileContents, PersistedLink, PersistedObject, PersistedTypeTable};
pub use scheduler::PersistenceScheduler;
