//! Client languages and translatable entity kinds

use std::fmt;
use std::str::FromStr;

/// A language the host ships localized data tables for
///
/// The discriminants match the host's own client language ids.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Japanese = 0,
    English = 1,
    German = 2,
    French = 3,
}

impl Language {
    /// Every supported language, in id order
    pub const ALL: [Language; 4] = [
        Language::Japanese,
        Language::English,
        Language::German,
        Language::French,
    ];

    /// Convert a raw host language id
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Language::Japanese),
            1 => Some(Language::English),
            2 => Some(Language::German),
            3 => Some(Language::French),
            _ => None,
        }
    }

    /// Raw host language id
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in config files
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Japanese => "japanese",
            Language::English => "english",
            Language::German => "german",
            Language::French => "french",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown language name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language: {}", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "japanese" | "ja" => Ok(Language::Japanese),
            "english" | "en" => Ok(Language::English),
            "german" | "de" => Ok(Language::German),
            "french" | "fr" => Ok(Language::French),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Kind of entity a translation belongs to
///
/// Each kind is backed by its own host data table and its own id space.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item = 0,
    Action = 1,
}

impl EntityKind {
    /// Convert a raw kind id as passed over the C ABI
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(EntityKind::Item),
            1 => Some(EntityKind::Action),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Action => "action",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
