//! Localized data source interface
//!
//! The host keeps one data table per language. The bridge answers lookups
//! against those tables; the core never reads them directly.

use langswap_sdk::{EntityKind, Language};

/// Localized text of one entity in one language
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityText {
    /// Display name (empty when the row has none)
    pub name: String,
    /// Long description (empty when the row has none)
    pub description: String,
}

impl EntityText {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Name, unless it is blank
    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    /// Description, unless it is blank
    pub fn description(&self) -> Option<&str> {
        non_blank(&self.description)
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Read-only access to the host's localized data tables
///
/// Implementations must query the table of the requested language; the
/// host stores each language separately.
pub trait DataSource: Send + Sync {
    /// Look up one row, returning `None` when it does not exist
    fn lookup(&self, kind: EntityKind, id: u32, language: Language) -> Option<EntityText>;
}

impl<F> DataSource for F
where
    F: Fn(EntityKind, u32, Language) -> Option<EntityText> + Send + Sync,
{
    fn lookup(&self, kind: EntityKind, id: u32, language: Language) -> Option<EntityText> {
        self(kind, id, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_absent() {
        let text = EntityText::new("Potion", "  ");
        assert_eq!(text.name(), Some("Potion"));
        assert_eq!(text.description(), None);
    }

    #[test]
    fn test_closure_data_source() {
        let source = |kind: EntityKind, id: u32, _lang: Language| {
            (kind == EntityKind::Item && id == 1).then(|| EntityText::new("Potion", ""))
        };
        assert!(source.lookup(EntityKind::Item, 1, Language::English).is_some());
        assert!(source.lookup(EntityKind::Action, 1, Language::English).is_none());
    }
}
