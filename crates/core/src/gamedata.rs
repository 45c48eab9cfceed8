//! Gamedata system for loading signatures and offsets from JSON
//!
//! Signatures and structure offsets change with every host build. They are
//! kept in a gamedata JSON file deployed with the plugin so they can be
//! updated without recompiling. A copy matching the last known build is
//! compiled in and used when no file is deployed.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::scanner::{ScanError, SignaturePattern};

/// Gamedata compiled into the plugin
const BUILTIN_GAMEDATA: &str = include_str!("../../../gamedata/langswap.games.json");

/// Errors that can occur when loading gamedata
#[derive(Debug, Error)]
pub enum GamedataError {
    #[error("Failed to read gamedata file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse gamedata JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Signature not found: {0}")]
    SignatureNotFound(String),

    #[error("Offset not found: {0}")]
    OffsetNotFound(String),

    #[error("Offset {name} is out of range: {value}")]
    OffsetOutOfRange { name: String, value: i64 },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Platform-specific signature entry
#[derive(Debug, Deserialize)]
pub struct SignatureEntry {
    /// Windows signature pattern
    pub windows: Option<String>,
    /// Linux signature pattern
    pub linux: Option<String>,
}

/// Platform-specific offset entry
#[derive(Debug, Deserialize)]
pub struct OffsetEntry {
    /// Windows offset value
    pub windows: Option<i64>,
    /// Linux offset value
    pub linux: Option<i64>,
}

/// Loaded gamedata
#[derive(Debug, Default)]
pub struct Gamedata {
    /// Host build the entries were taken from
    game_version: Option<String>,
    signatures: HashMap<String, SignatureEntry>,
    offsets: HashMap<String, OffsetEntry>,
}

impl Gamedata {
    /// The gamedata compiled into the plugin
    pub fn builtin() -> Result<Self, GamedataError> {
        Self::load_from_str(BUILTIN_GAMEDATA)
    }

    /// Load gamedata from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GamedataError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Load `path` if it exists, the built-in copy otherwise
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self, GamedataError> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading gamedata from {:?}", path);
            Self::load_from_file(path)
        } else {
            tracing::debug!("No gamedata at {:?}, using built-in copy", path);
            Self::builtin()
        }
    }

    /// Load gamedata from a JSON string
    pub fn load_from_str(json: &str) -> Result<Self, GamedataError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut gamedata = Gamedata::default();

        for (name, value) in raw {
            if name == "version" {
                gamedata.game_version = value.as_str().map(str::to_string);
            }
            // Check if it has "signatures" key
            else if let Some(signatures) = value.get("signatures") {
                let entry: SignatureEntry = serde_json::from_value(signatures.clone())?;
                gamedata.signatures.insert(name, entry);
            }
            // Check if it has "offsets" key
            else if let Some(offsets) = value.get("offsets") {
                let entry: OffsetEntry = serde_json::from_value(offsets.clone())?;
                gamedata.offsets.insert(name, entry);
            }
        }

        tracing::info!(
            "Loaded gamedata ({}): {} signatures, {} offsets",
            gamedata.game_version.as_deref().unwrap_or("unversioned"),
            gamedata.signatures.len(),
            gamedata.offsets.len()
        );

        Ok(gamedata)
    }

    /// Host build these entries match
    pub fn game_version(&self) -> Option<&str> {
        self.game_version.as_deref()
    }

    /// Get a signature by name for the current platform
    pub fn get_signature(&self, name: &str) -> Result<&str, GamedataError> {
        let entry = self
            .signatures
            .get(name)
            .ok_or_else(|| GamedataError::SignatureNotFound(name.to_string()))?;

        #[cfg(target_os = "linux")]
        let sig = entry.linux.as_deref();

        #[cfg(target_os = "windows")]
        let sig = entry.windows.as_deref();

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        let sig: Option<&str> = None;

        sig.ok_or_else(|| {
            GamedataError::SignatureNotFound(format!("{} (no signature for this platform)", name))
        })
    }

    /// Get a parsed signature pattern by name for the current platform
    pub fn pattern(&self, name: &str) -> Result<SignaturePattern, GamedataError> {
        Ok(SignaturePattern::parse(self.get_signature(name)?)?)
    }

    /// Get an offset by name for the current platform
    pub fn get_offset(&self, name: &str) -> Result<i64, GamedataError> {
        let entry = self
            .offsets
            .get(name)
            .ok_or_else(|| GamedataError::OffsetNotFound(name.to_string()))?;

        #[cfg(target_os = "linux")]
        let offset = entry.linux;

        #[cfg(target_os = "windows")]
        let offset = entry.windows;

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        let offset: Option<i64> = None;

        offset.ok_or_else(|| {
            GamedataError::OffsetNotFound(format!("{} (no offset for this platform)", name))
        })
    }

    /// Get an offset that must be a non-negative byte offset or index
    pub fn get_usize(&self, name: &str) -> Result<usize, GamedataError> {
        let value = self.get_offset(name)?;
        usize::try_from(value).map_err(|_| GamedataError::OffsetOutOfRange {
            name: name.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_gamedata() {
        let json = r#"{
            "version": "2025.01.01",
            "UpdateCastBar": {
                "signatures": {
                    "linux": "48 83 EC 38 48 8B 92",
                    "windows": "48 83 EC 38 48 8B 92"
                }
            },
            "StringArrayData.Size": {
                "offsets": { "linux": 8, "windows": 8 }
            }
        }"#;

        let gd = Gamedata::load_from_str(json).unwrap();
        assert_eq!(gd.signatures.len(), 1);
        assert_eq!(gd.offsets.len(), 1);
        assert_eq!(gd.game_version(), Some("2025.01.01"));

        #[cfg(any(target_os = "linux", target_os = "windows"))]
        {
            let pattern = gd.pattern("UpdateCastBar").unwrap();
            assert_eq!(pattern.len(), 7);
            assert_eq!(gd.get_usize("StringArrayData.Size").unwrap(), 8);
        }
    }

    #[test]
    fn test_missing_entries() {
        let gd = Gamedata::load_from_str("{}").unwrap();
        assert!(matches!(
            gd.get_signature("Nope"),
            Err(GamedataError::SignatureNotFound(_))
        ));
        assert!(matches!(
            gd.get_offset("Nope"),
            Err(GamedataError::OffsetNotFound(_))
        ));
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    fn test_negative_index_rejected() {
        let json = r#"{ "Bad": { "offsets": { "linux": -1, "windows": -1 } } }"#;
        let gd = Gamedata::load_from_str(json).unwrap();
        assert!(matches!(
            gd.get_usize("Bad"),
            Err(GamedataError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_builtin_gamedata_parses() {
        let gd = Gamedata::builtin().unwrap();
        assert!(gd.game_version().is_some());

        #[cfg(any(target_os = "linux", target_os = "windows"))]
        for name in [
            "GenerateItemTooltip",
            "ItemHovered",
            "GenerateActionTooltip",
            "UpdateCastBar",
        ] {
            assert!(gd.pattern(name).is_ok(), "{name}");
        }
    }
}
