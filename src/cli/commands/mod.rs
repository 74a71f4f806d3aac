//! Command implementations

pub mod annotate;
pub mod collect;
pub mod history;
pub mod reevaluate;

pub use annotate::run_annotate;
pub use collect::run_collect;
pub use history::run_history;
pub use reevaluate::run_reevaluate;

use anyhow::{Context, Result};

use crate::app::AppConfig;
use crate::config::{AppSettings, ConfigLoader};
use crate::measurement_log::MeasurementLog;
use crate::storage::StorageFactory;

/// Settings plus the measurement log they describe
pub struct CommandContext {
    pub settings: AppSettings,
    pub log: MeasurementLog,
}

impl CommandContext {
    /// Load the settings file and open the configured store
    pub async fn open(app: &AppConfig) -> Result<Self> {
        let loader = ConfigLoader::new(app.config_path.clone(), &app.working_dir);
        let settings = loader.load().await?;
        Self::from_settings(settings).await
    }

    pub async fn from_settings(settings: AppSettings) -> Result<Self> {
        let store = StorageFactory::from_config(&settings.storage)
            .await
            .map_err(crate::error::QualityError::from)
            .context("Failed to open the measurement store")?;
        let log = MeasurementLog::new(store, settings.storage.cas_retries);
        Ok(Self { settings, log })
    }
}
