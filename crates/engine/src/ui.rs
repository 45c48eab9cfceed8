//! Host UI refresh primitives
//!
//! Swapping language only changes what the next tooltip generation writes.
//! These calls let a surface force the host to redraw what is already on
//! screen.

/// Access to the host's UI windows ("addons") by name
pub trait AddonHost: Send + Sync {
    /// Whether the named addon exists and is currently shown
    fn is_visible(&self, addon: &str) -> bool;

    /// Hide and re-show the named addon so the host regenerates its content
    ///
    /// Returns `false` when the addon does not exist.
    fn regenerate(&self, addon: &str) -> bool;

    /// Replace the first non-empty text node of the named addon
    ///
    /// Returns `false` when the addon does not exist or has no text node.
    fn set_text(&self, addon: &str, text: &str) -> bool;
}

/// Addon host for environments without a UI (tests, headless loads)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUi;

impl AddonHost for NoUi {
    fn is_visible(&self, _addon: &str) -> bool {
        false
    }

    fn regenerate(&self, _addon: &str) -> bool {
        false
    }

    fn set_text(&self, _addon: &str, _text: &str) -> bool {
        false
    }
}
