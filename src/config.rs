use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::types::BriefOptions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for the header (defaults to the backend host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub briefs: BriefsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the backend, including the `/api` prefix.
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  "http://localhost:8000/api".to_string()
}

/// Defaults for brief generation, overridable per config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BriefsConfig {
  #[serde(default = "default_true")]
  pub include_email: bool,
  #[serde(default = "default_true")]
  pub include_crm: bool,
  #[serde(default = "default_true")]
  pub include_calendar: bool,
  #[serde(default = "default_lookback_days")]
  pub lookback_days: u32,
}

impl Default for BriefsConfig {
  fn default() -> Self {
    Self {
      include_email: true,
      include_crm: true,
      include_calendar: true,
      lookback_days: default_lookback_days(),
    }
  }
}

impl BriefsConfig {
  pub fn options(&self) -> BriefOptions {
    BriefOptions {
      include_email: self.include_email,
      include_crm: self.include_crm,
      include_calendar: self.include_calendar,
      lookback_days: self.lookback_days,
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_lookback_days() -> u32 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./b9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/b9s/config.yaml
  ///
  /// Without a config file the defaults apply (localhost backend); the
  /// dashboard needs no credentials.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("b9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("b9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_without_file() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "http://localhost:8000/api");
    assert!(config.briefs.include_email);
    assert_eq!(config.briefs.lookback_days, 30);
  }

  #[test]
  fn test_parse_partial_yaml() {
    let config: Config = serde_yaml::from_str(
      "api:\n  base_url: https://briefs.example.com/api\nbriefs:\n  include_crm: false\n",
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://briefs.example.com/api");
    assert!(!config.briefs.include_crm);
    // Unspecified fields keep their defaults.
    assert!(config.briefs.include_email);
    assert_eq!(config.briefs.lookback_days, 30);
  }

  #[test]
  fn test_options_mirror_config() {
    let config: Config = serde_yaml::from_str("briefs:\n  lookback_days: 14\n").unwrap();
    let options = config.briefs.options();
    assert_eq!(options.lookback_days, 14);
    assert!(options.include_calendar);
  }
}
