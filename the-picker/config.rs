//! Picker configuration, read from TOML.
//!
//! ```toml
//! tick-interval-ms = 10
//! cycle = true
//!
//! [collect]
//! threshold = 50000
//!
//! [match]
//! chunk-size = 500
//! incremental = true
//!
//! [render]
//! height = 20
//! ```

use std::{
  fs,
  io::ErrorKind,
  path::Path,
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read picker config: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse picker config: {0}")]
  Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CollectConfig {
  /// Stop collecting once this many items arrived.
  pub threshold:         usize,
  pub chunk_size:        usize,
  pub chunk_interval_ms: u64,
}

impl Default for CollectConfig {
  fn default() -> Self {
    Self {
      threshold:         100_000,
      chunk_size:        1_000,
      chunk_interval_ms: 0,
    }
  }
}

impl CollectConfig {
  pub fn chunk_interval(&self) -> Duration {
    Duration::from_millis(self.chunk_interval_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct MatchConfig {
  pub threshold:         usize,
  pub chunk_size:        usize,
  pub chunk_interval_ms: u64,
  /// Expose partial results after every chunk, whatever the matcher says.
  pub incremental:       bool,
}

impl Default for MatchConfig {
  fn default() -> Self {
    Self {
      threshold:         100_000,
      chunk_size:        1_000,
      chunk_interval_ms: 0,
      incremental:       false,
    }
  }
}

impl MatchConfig {
  pub fn chunk_interval(&self) -> Duration {
    Duration::from_millis(self.chunk_interval_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RenderConfig {
  /// Visible rows.
  pub height:        usize,
  /// Target width handed to the renderer.
  pub width:         usize,
  /// Rows kept between the cursor and the viewport edges.
  pub scroll_offset: usize,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      height:        10,
      width:         80,
      scroll_offset: 2,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PickerConfig {
  pub tick_interval_ms: u64,
  /// Wrap the cursor around the list ends.
  pub cycle:            bool,
  pub collect:          CollectConfig,
  #[serde(rename = "match")]
  pub matching:         MatchConfig,
  pub render:           RenderConfig,
}

impl Default for PickerConfig {
  fn default() -> Self {
    Self {
      tick_interval_ms: 10,
      cycle:            false,
      collect:          CollectConfig::default(),
      matching:         MatchConfig::default(),
      render:           RenderConfig::default(),
    }
  }
}

impl PickerConfig {
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(source)?)
  }

  /// Load from `path`, falling back to defaults when the file is missing.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    match fs::read_to_string(path) {
      Ok(source) => Self::from_toml_str(&source),
      Err(err) if err.kind() == ErrorKind::NotFound => {
        log::debug!("no picker config at {}, using defaults", path.display());
        Ok(Self::default())
      },
      Err(err) => Err(err.into()),
    }
  }

  /// Scheduler tick, never zero.
  pub fn tick_interval(&self) -> Duration {
    Duration::from_millis(self.tick_interval_ms.max(1))
  }
}
