//! Read-through translation cache
//!
//! Lookups hit the data source at most once per key, misses included. The
//! host's tables do not change during a session, so entries are never
//! invalidated individually; [`TranslationCache::clear`] drops everything.

use std::sync::Arc;

use dashmap::DashMap;
use langswap_engine::{DataSource, EntityText};
use langswap_sdk::{EntityKind, Language};

use crate::config::Limits;

/// Identifies one cached translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    pub kind: EntityKind,
    pub id: u32,
    pub language: Language,
}

/// Memoizing front of a [`DataSource`]
///
/// No map guard is held while the data source runs, so a lookup that
/// re-enters the cache (the host regenerating a tooltip from inside a table
/// read) cannot deadlock.
pub struct TranslationCache {
    source: Arc<dyn DataSource>,
    limits: Limits,
    entries: DashMap<TranslationKey, Option<Arc<EntityText>>>,
}

impl TranslationCache {
    pub fn new(source: Arc<dyn DataSource>, limits: Limits) -> Self {
        Self {
            source,
            limits,
            entries: DashMap::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Text of `id` in `language`, or `None` when the id is out of range or
    /// the data source has no such row
    pub fn get(&self, kind: EntityKind, id: u32, language: Language) -> Option<Arc<EntityText>> {
        if !self.limits.id_in_range(kind, id) {
            tracing::trace!("Ignoring out of range {} id {}", kind, id);
            return None;
        }

        let key = TranslationKey { kind, id, language };
        if let Some(entry) = self.entries.get(&key) {
            return entry.value().clone();
        }

        let text = self.source.lookup(kind, id, language).map(Arc::new);
        match &text {
            Some(text) => tracing::debug!("Cached {} {} ({}): {}", kind, id, language, text.name),
            None => tracing::debug!("Cached missing {} {} ({})", kind, id, language),
        }

        // A re-entrant lookup may have filled the key meanwhile; first one wins
        self.entries.entry(key).or_insert(text).value().clone()
    }

    /// Non-blank name of an entity
    pub fn name(&self, kind: EntityKind, id: u32, language: Language) -> Option<String> {
        self.get(kind, id, language)
            .and_then(|text| text.name().map(str::to_owned))
    }

    /// Non-blank description of an entity
    pub fn description(&self, kind: EntityKind, id: u32, language: Language) -> Option<String> {
        self.get(kind, id, language)
            .and_then(|text| text.description().map(str::to_owned))
    }

    /// Drop every entry, found and missing alike
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::info!("Cleared {} cached translations", count);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
