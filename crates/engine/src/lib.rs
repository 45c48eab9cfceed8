//! LangSwap Engine - Host Interfaces and Global Storage
//!
//! This crate handles:
//! - The collaborator interfaces the host side provides ([`DataSource`],
//!   [`AddonHost`])
//! - Locating the host's executable code section ([`CodeRegion`])
//! - Storing the host services in thread-safe global statics
//!
//! # Architecture
//!
//! The host-side bridge hands its services over once during plugin load.
//! They are stored in [`globals::HostGlobals`] and accessed via the
//! [`host()`] function.
//!
//! # Thread Safety
//!
//! All services are valid for the plugin's lifetime. The host thread ID is
//! stored for runtime checks via [`is_main_thread()`].

pub mod data;
pub mod error;
pub mod globals;
pub mod image;
pub mod ui;

pub use data::{DataSource, EntityText};
pub use error::HostError;
pub use globals::{clear_host, host, init_host, is_host_initialized, is_main_thread, try_host, HostGlobals};
pub use image::CodeRegion;
pub use ui::{AddonHost, NoUi};
