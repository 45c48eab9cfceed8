//! Data source fakes

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use langswap_engine::{DataSource, EntityText};
use langswap_sdk::{EntityKind, Language};

#[derive(Default)]
pub struct CountingSource {
    rows: HashMap<(EntityKind, u32, Language), EntityText>,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn with(mut self, kind: EntityKind, id: u32, language: Language, name: &str, description: &str) -> Self {
        self.rows
            .insert((kind, id, language), EntityText::new(name, description));
        self
    }

    /// Item 1 in every language, action 7 in English and French
    pub fn potions() -> Self {
        Self::default()
            .with(EntityKind::Item, 1, Language::English, "Potion", "Restores HP.")
            .with(EntityKind::Item, 1, Language::French, "Potion de vie", "Restaure des PV.")
            .with(EntityKind::Item, 1, Language::German, "Trank", "Stellt LP wieder her.")
            .with(EntityKind::Item, 1, Language::Japanese, "ポーション", "HPを回復する。")
            .with(EntityKind::Action, 7, Language::English, "Fire", "Deals fire damage.")
            .with(EntityKind::Action, 7, Language::French, "Feu", "Inflige des dégâts de feu.")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSource for CountingSource {
    fn lookup(&self, kind: EntityKind, id: u32, language: Language) -> Option<EntityText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.get(&(kind, id, language)).cloned()
    }
}

/// Data source that panics on every lookup
pub struct PanickingSource;

impl DataSource for PanickingSource {
    fn lookup(&self, kind: EntityKind, id: u32, language: Language) -> Option<EntityText> {
        panic!("lookup of {kind} {id} ({language}) failed")
    }
}
