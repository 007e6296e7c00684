use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::mode::Mode;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub default_mode: Option<String>,
    /// argv of a speech-to-text command that prints a transcript on stdout
    pub dictation_command: Option<Vec<String>>,
    pub api_base: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_mode(mode: Mode) -> Result<()> {
        Self::save_default_mode_to(&Self::get_config_path()?, mode)
    }

    /// Record `mode` in the file at `config_path`. A file that doesn't parse is
    /// left untouched and the error returned.
    pub fn save_default_mode_to(config_path: &Path, mode: Mode) -> Result<()> {
        let mut config = Self::load_from(config_path)
            .map_err(|e| anyhow!("Not saving default mode, {} is invalid: {}", config_path.display(), e))?;
        config.default_mode = Some(mode.as_str().to_string());
        config.save_to(config_path)
    }

    /// API key: GEMINI_API_KEY, then API_KEY, then the config file
    pub fn api_key(&self) -> Option<String> {
        first_non_empty([
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("API_KEY").ok(),
            self.gemini_api_key.clone(),
        ])
    }

    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn api_base(&self) -> String {
        self.api_base.clone().unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    pub fn mode(&self) -> Mode {
        self.default_mode
            .as_deref()
            .and_then(Mode::from_str)
            .unwrap_or(Mode::Text)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("grounded-search").join("config.json"))
    }
}

/// First candidate that isn't blank
fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|k| !k.trim().is_empty())
}
