//! Configuration parsing and management.
//!
//! Configuration is a TOML file with a `[draw]` section (tier capacities and
//! the override rule) and a `[server]` section (delivery-layer settings).
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [draw.tiers]
//! small = 20
//! medium = 10
//! big = 5
//!
//! [draw.override_rule]
//! enabled = true
//! trigger_draw_index = 34
//! participant_id = 57
//!
//! [server]
//! listen_addr = "127.0.0.1:8000"
//! database_path = "lottery.db"
//! roster_path = "data/participants.json"
//! photo_dir = "static/images"
//! suspense_delay_ms = { min = 1000, max = 2000 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::OverrideRule;
use crate::tier::TierTable;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Parsed, but semantically invalid.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub draw: DrawConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like [`AppConfig::from_file`], but a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails [`AppConfig::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects settings the engine cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rule = &self.draw.override_rule;
        if rule.enabled {
            if rule.trigger_draw_index == 0 {
                return Err(ConfigError::Validation(
                    "draw.override_rule.trigger_draw_index must be at least 1".to_string(),
                ));
            }
            if rule.participant_id == 0 {
                return Err(ConfigError::Validation(
                    "draw.override_rule.participant_id must be positive".to_string(),
                ));
            }
        }

        let delay = &self.server.suspense_delay_ms;
        if delay.min > delay.max {
            return Err(ConfigError::Validation(format!(
                "server.suspense_delay_ms min ({}) exceeds max ({})",
                delay.min, delay.max
            )));
        }
        Ok(())
    }
}

/// Draw rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawConfig {
    #[serde(default)]
    pub tiers: TierTotals,

    #[serde(default)]
    pub override_rule: OverrideRuleConfig,
}

/// Capacity of each tier, applied when the store is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierTotals {
    #[serde(default = "default_small")]
    pub small: u32,
    #[serde(default = "default_medium")]
    pub medium: u32,
    #[serde(default = "default_big")]
    pub big: u32,
}

const fn default_small() -> u32 {
    20
}

const fn default_medium() -> u32 {
    10
}

const fn default_big() -> u32 {
    5
}

impl Default for TierTotals {
    fn default() -> Self {
        Self {
            small: default_small(),
            medium: default_medium(),
            big: default_big(),
        }
    }
}

impl TierTotals {
    /// A full-capacity tier table for seeding the store.
    #[must_use]
    pub const fn table(&self) -> TierTable {
        TierTable::full(self.small, self.medium, self.big)
    }
}

/// The configurable form of [`OverrideRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_trigger_draw_index")]
    pub trigger_draw_index: u64,
    #[serde(default = "default_override_participant")]
    pub participant_id: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_trigger_draw_index() -> u64 {
    34
}

const fn default_override_participant() -> u32 {
    57
}

impl Default for OverrideRuleConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            trigger_draw_index: default_trigger_draw_index(),
            participant_id: default_override_participant(),
        }
    }
}

impl OverrideRuleConfig {
    /// The rule to inject into the engine, `None` when disabled.
    #[must_use]
    pub const fn rule(&self) -> Option<OverrideRule> {
        if self.enabled {
            Some(OverrideRule::new(self.trigger_draw_index, self.participant_id))
        } else {
            None
        }
    }
}

/// Delivery-layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// `SQLite` database holding the draw state.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Participant roster JSON.
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,

    /// Directory every roster photo must exist in.
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,

    /// Pause before a proposal is returned. Presentation only.
    #[serde(default)]
    pub suspense_delay_ms: DelayRange,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("lottery.db")
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("data/participants.json")
}

fn default_photo_dir() -> PathBuf {
    PathBuf::from("static/images")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_path: default_database_path(),
            roster_path: default_roster_path(),
            photo_dir: default_photo_dir(),
            suspense_delay_ms: DelayRange::default(),
        }
    }
}

/// Inclusive millisecond range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: 1_000,
            max: 2_000,
        }
    }
}

impl DelayRange {
    /// No delay at all.
    pub const NONE: Self = Self { min: 0, max: 0 };
}
