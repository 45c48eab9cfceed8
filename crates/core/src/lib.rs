//! LangSwap Core
//!
//! Rewrites the text of host tooltips and cast bars into another client
//! language while the game is running.
//!
//! # Layers
//!
//! - [`scanner`] and [`gamedata`] locate host functions by byte signature
//! - [`hooks`] places inline interceptions on them
//! - [`memory`] reads and writes the host's UI arrays with bounds checks
//! - [`translation`] caches localized text per entity and language
//! - [`surfaces`] rewrite one kind of UI text each, driven by a [`HookManager`]
//! - [`toggle`] and [`frame`] defer language changes to the render loop
//! - [`runtime`] ties it together behind [`LangSwap`]
//!
//! # Re-exports
//!
//! - [`sdk`] - Host types and language ids
//! - [`engine`] - Host collaborator interfaces and globals

pub use langswap_engine as engine;
pub use langswap_sdk as sdk;

#[doc(hidden)]
pub use paste;

pub mod config;
pub mod frame;
pub mod gamedata;
pub mod hooks;
pub mod memory;
pub mod runtime;
pub mod scanner;
pub mod surfaces;
pub mod tasks;
pub mod toggle;
pub mod translation;

pub use config::{ConfigError, ConfigResult, LangSwapConfig};
pub use frame::{FrameControl, FrameKey, FrameScheduler};
pub use gamedata::{Gamedata, GamedataError};
pub use hooks::{HookError, Interception, SignatureResolver, SymbolResolver};
pub use memory::MemoryError;
pub use runtime::{LangSwap, RuntimeError};
pub use scanner::{ScanError, Scanner};
pub use surfaces::{HookManager, HookSetError, HookState, Surface, Surfaces, TranslationHook};
pub use tasks::queue_task;
pub use toggle::{LanguageToggle, ToggleAction};
pub use translation::TranslationCache;
