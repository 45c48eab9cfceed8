//! LangSwap Plugin - FFI Layer
//!
//! This crate provides the FFI boundary between the host-side bridge and the
//! Rust core. It compiles to a cdylib (.so/.dll) whose exports are listed in
//! the generated `include/langswap.h`.

pub mod ffi;
mod logging;

pub use ffi::bridge::{LangSwapApi, LangSwapText};
