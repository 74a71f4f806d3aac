//! Storage factory for creating store instances

use std::sync::Arc;

use super::backends::{FileBackend, MemoryBackend};
use super::config::{BackendType, StoreConfig};
use super::error::StorageResult;
use super::traits::MeasurementStore;

/// Factory for creating measurement stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from explicit configuration
    pub async fn from_config(config: &StoreConfig) -> StorageResult<Arc<dyn MeasurementStore>> {
        match config.backend {
            BackendType::File => {
                let backend = FileBackend::new(config).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
        }
    }
}
