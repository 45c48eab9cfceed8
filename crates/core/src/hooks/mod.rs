//! Hook system
//!
//! Inline detours built on iced-x86, typed static interceptions declared with
//! [`interception!`](crate::interception), and resolution of hook targets from
//! gamedata signatures.

pub mod inline;
mod resolver;
pub mod trampoline;

pub use inline::{
    create_inline_hook, disable_inline_hook, enable_inline_hook, is_inline_hook_enabled,
    remove_inline_hook, HookError, InlineHookKey, Interception,
};
pub use resolver::{hook_symbol, InstallError, SignatureResolver, SymbolResolver};
