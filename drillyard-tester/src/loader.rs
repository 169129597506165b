use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

use drillyard_game::{BuiltinCampaign, CampaignConfig, ConfigError, DataLoader};

#[derive(Debug, Error)]
pub enum CampaignFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Campaign definition read from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct CampaignFile {
    path: PathBuf,
}

impl CampaignFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLoader for CampaignFile {
    type Error = CampaignFileError;

    fn load_campaign(&self) -> Result<CampaignConfig, Self::Error> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| CampaignFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        CampaignConfig::from_json(&json).map_err(|source| CampaignFileError::Config {
            path: self.path.clone(),
            source,
        })
    }
}

/// Load and validate the campaign, from `path` when given, else the built-in one.
pub fn load_campaign(path: Option<&Path>) -> Result<CampaignConfig> {
    let config = match path {
        Some(path) => CampaignFile::new(path).load_campaign()?,
        None => BuiltinCampaign.load_campaign()?,
    };
    config.validate().context("campaign config failed validation")?;
    log::debug!("campaign loaded with {} zones", config.zones.len());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::temp_path;

    #[test]
    fn builtin_campaign_loads_without_a_path() {
        let config = load_campaign(None).unwrap();
        assert_eq!(config, CampaignConfig::default_config());
    }

    #[test]
    fn file_campaign_round_trips_and_reports_errors() {
        let path = temp_path("campaign");
        let json = serde_json::to_string_pretty(&CampaignConfig::default_config()).unwrap();
        std::fs::write(&path, json).unwrap();
        assert!(load_campaign(Some(path.as_path())).is_ok());

        std::fs::write(&path, "{ \"zones\": [] }").unwrap();
        let err = load_campaign(Some(path.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("has no configuration"));

        std::fs::remove_file(&path).ok();
        assert!(matches!(
            CampaignFile::new(&path).load_campaign(),
            Err(CampaignFileError::Io { .. })
        ));
    }
}
