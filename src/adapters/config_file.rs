//! JSON settings file adapter.
//!
//! Implements [`ConfigPort`] by reading one JSON document at startup.
//! Every field is optional (missing ones take their defaults); the
//! assembled config is range-checked before it is handed out.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::PlayerConfig;
use crate::error::ConfigFault;

pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse and validate a JSON document.
    pub fn parse(text: &str) -> Result<PlayerConfig, ConfigFault> {
        let cfg: PlayerConfig = serde_json::from_str(text).map_err(|e| ConfigFault::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ConfigPort for JsonFileConfig {
    fn load(&self) -> Result<PlayerConfig, ConfigFault> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| ConfigFault::Missing(format!("{}: {}", self.path.display(), e)))?;
        let cfg = Self::parse(&text)?;
        info!("config loaded from {}", self.path.display());
        Ok(cfg)
    }
}
