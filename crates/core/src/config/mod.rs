//! Configuration system for LangSwap
//!
//! User settings are read from a TOML file next to the plugin. Every field
//! has a default, so a missing file or a partial file is fine. The core
//! never writes the file back; the settings UI owns persistence.
//!
//! # Example
//!
//! ```toml
//! client_language = "english"
//! target_language = "french"
//!
//! [surfaces]
//! cast_bar = false
//!
//! [toggle]
//! delay_frames = 5
//! ```

mod loader;

use std::path::Path;

use langswap_sdk::{EntityKind, Language};
use serde::{Deserialize, Serialize};

use crate::surfaces::Surfaces;

pub use loader::{config_path, configs_dir, gamedata_path, CONFIG_FILE, GAMEDATA_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LangSwapConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Language the host client runs in
    #[serde(with = "language_name")]
    pub client_language: Language,

    /// Language shown while swapped
    #[serde(with = "language_name")]
    pub target_language: Language,

    pub surfaces: SurfaceToggles,
    pub toggle: ToggleConfig,
    pub limits: Limits,
    pub markers: MarkerConfig,
}

impl Default for LangSwapConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            client_language: Language::English,
            target_language: Language::English,
            surfaces: SurfaceToggles::default(),
            toggle: ToggleConfig::default(),
            limits: Limits::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl LangSwapConfig {
    /// Load config from `path`, falling back to defaults if it is missing
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::load_from_str(&content)?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string
    pub fn load_from_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Which translatable surfaces are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceToggles {
    pub cast_bar: bool,
    pub action_detail: bool,
    pub item_detail: bool,
}

impl Default for SurfaceToggles {
    fn default() -> Self {
        Self {
            cast_bar: true,
            action_detail: true,
            item_detail: true,
        }
    }
}

impl SurfaceToggles {
    pub fn enabled(&self) -> Surfaces {
        let mut surfaces = Surfaces::empty();
        surfaces.set(Surfaces::CAST_BAR, self.cast_bar);
        surfaces.set(Surfaces::ACTION_DETAIL, self.action_detail);
        surfaces.set(Surfaces::ITEM_DETAIL, self.item_detail);
        surfaces
    }
}

/// Deferral and debounce of the swap shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    /// Frames to wait between a request and the actual swap/restore
    pub delay_frames: u32,
    /// Minimum time between two accepted requests
    pub min_interval_ms: u64,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            delay_frames: 3,
            min_interval_ms: 250,
        }
    }
}

/// Bounds applied before touching the data source or host memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_item_id: u32,
    pub max_action_id: u32,
    /// Largest encoded text (including the terminator) written into a host slot
    pub max_text_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_item_id: 100_000,
            max_action_id: 100_000,
            max_text_bytes: 10 * 1024,
        }
    }
}

impl Limits {
    pub fn max_id(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Item => self.max_item_id,
            EntityKind::Action => self.max_action_id,
        }
    }

    /// Whether `id` is a valid id of `kind` (`1..=max`)
    pub fn id_in_range(&self, kind: EntityKind, id: u32) -> bool {
        (1..=self.max_id(kind)).contains(&id)
    }
}

/// Glyphs the host embeds in item names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub glamoured: char,
    pub high_quality: char,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            glamoured: '\u{E03B}',
            high_quality: '\u{E03C}',
        }
    }
}

impl MarkerConfig {
    pub fn glyphs(&self) -> [char; 2] {
        [self.glamoured, self.high_quality]
    }
}

/// Languages are stored by name in TOML
mod language_name {
    use langswap_sdk::Language;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(lang: &Language, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(lang.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Language, D::Error> {
        let name = String::deserialize(d)?;
        name.parse().map_err(de::Error::custom)
    }
}
