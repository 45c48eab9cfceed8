//! LangSwap SDK - Host Type Definitions
//!
//! This crate contains the type definitions shared by every other crate:
//! languages, entity kinds, opaque host structures and the signatures of
//! the host functions that get intercepted. It has no dependencies and
//! compiles quickly, allowing parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`language`] - Client languages and translatable entity kinds
//! - [`host`] - Opaque host structures and intercepted function types
//! - [`sestring`] - Byte markers of the host's formatted text encoding

pub mod host;
pub mod language;
pub mod sestring;

pub use host::*;
pub use language::{EntityKind, Language};
