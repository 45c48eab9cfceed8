//! C ABI of the plugin

pub mod bridge;
pub mod exports;
