use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{global_config_dir, AppSettings, CONFIG_FILE_NAME};
use crate::error::{common, ErrorCode, QualityError, Result};

/// Locates and loads the settings file
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
    working_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(explicit: Option<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            explicit,
            working_dir: working_dir.into(),
        }
    }

    /// The file that will be read: the explicit path, else the working
    /// directory's file, else the per-user one
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }

        let local = self.working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }
        if let Some(global) = global_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
            if global.exists() {
                return Ok(global);
            }
        }
        Err(common::config_not_found(local))
    }

    /// Read, parse, override from the environment and validate
    pub async fn load(&self) -> Result<AppSettings> {
        let path = self.resolve()?;
        let mut settings = Self::load_file(&path).await?;
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn load_file(path: &Path) -> Result<AppSettings> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                common::config_not_found(path)
            } else {
                QualityError::config_with_code(
                    ErrorCode::CONFIG_GENERIC,
                    format!("Cannot read {}", path.display()),
                )
                .with_source(e)
            }
        })?;
        debug!("Loading settings from {}", path.display());
        AppSettings::from_yaml(&content).map_err(|e| e.with_context(path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_file_from_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "metrics:\n  m:\n    type: violations\n    target: \"0\"\n    near_target: \"1\"\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(None, dir.path());
        assert_eq!(loader.resolve().unwrap(), dir.path().join(CONFIG_FILE_NAME));
        let settings = ConfigLoader::load_file(&loader.resolve().unwrap())
            .await
            .unwrap();
        assert!(settings.metrics.contains_key("m"));
    }

    #[tokio::test]
    async fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(Some(dir.path().join("absent.yaml")), dir.path());
        let err = loader.load().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_yaml_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "metrics: [unclosed").unwrap();

        let err = ConfigLoader::load_file(&path).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
        assert!(err.to_string().contains("broken.yaml"));
    }
}
