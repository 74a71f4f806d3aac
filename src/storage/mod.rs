//! Persistence of measurement logs
//!
//! The store only knows documents and heads; deciding whether a cycle
//! extends or appends belongs to the measurement log.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod lock;
pub mod traits;

pub use backends::{FileBackend, MemoryBackend};
pub use config::{BackendType, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use lock::{FileLockGuard, StorageLock};
pub use traits::MeasurementStore;
