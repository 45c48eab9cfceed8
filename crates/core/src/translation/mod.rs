//! Translated text lookup
//!
//! A read-through cache in front of the host's localized data tables.

mod cache;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{TranslationCache, TranslationKey};
