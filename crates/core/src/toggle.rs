//! Deferred language toggle
//!
//! A shortcut press only schedules the swap. The change runs a few frames
//! later so half-drawn UI can settle, and presses closer together than the
//! configured interval are dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::ToggleConfig;
use crate::frame::{FrameKey, FrameScheduler};
use crate::surfaces::HookManager;

/// What a toggle request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Swap,
    Restore,
    /// Swap when idle, restore when swapped, decided when the action runs
    Toggle,
}

#[derive(Default)]
struct Pending {
    key: Option<FrameKey>,
    generation: u64,
    last_accepted: Option<Instant>,
}

/// Debounced, frame-deferred driver of a [`HookManager`]
pub struct LanguageToggle {
    config: ToggleConfig,
    manager: Arc<HookManager>,
    pending: Arc<Mutex<Pending>>,
}

impl LanguageToggle {
    pub fn new(config: ToggleConfig, manager: Arc<HookManager>) -> Self {
        Self {
            config,
            manager,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Schedule `action` on `scheduler`
    ///
    /// A newer request replaces one still waiting. Returns `false` if the
    /// request came too soon after the last accepted one.
    pub fn request(&self, scheduler: &FrameScheduler, action: ToggleAction) -> bool {
        let now = Instant::now();
        let min_interval = Duration::from_millis(self.config.min_interval_ms);

        let mut pending = self.pending.lock();
        if let Some(last) = pending.last_accepted {
            if now.duration_since(last) < min_interval {
                tracing::debug!("Ignoring {:?} request, last one was {:?} ago", action, now - last);
                return false;
            }
        }
        pending.last_accepted = Some(now);

        if let Some(key) = pending.key.take() {
            scheduler.unregister(key);
            tracing::debug!("Replaced pending language change");
        }

        pending.generation += 1;
        let generation = pending.generation;
        let manager = self.manager.clone();
        let slot = self.pending.clone();

        pending.key = Some(scheduler.defer_frames(self.config.delay_frames, move || {
            {
                let mut pending = slot.lock();
                if pending.generation == generation {
                    pending.key = None;
                }
            }
            apply(&manager, action);
        }));

        tracing::debug!(
            "{:?} scheduled in {} frames",
            action,
            self.config.delay_frames
        );
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().key.is_some()
    }

    /// Drop a change that has not run yet
    ///
    /// Returns `true` if one was pending.
    pub fn cancel(&self, scheduler: &FrameScheduler) -> bool {
        match self.pending.lock().key.take() {
            Some(key) => {
                scheduler.unregister(key);
                tracing::debug!("Cancelled pending language change");
                true
            }
            None => false,
        }
    }
}

fn apply(manager: &HookManager, action: ToggleAction) {
    match action {
        ToggleAction::Swap => manager.swap_language(),
        ToggleAction::Restore => manager.restore_language(),
        ToggleAction::Toggle if manager.is_swapped() => manager.restore_language(),
        ToggleAction::Toggle => manager.swap_language(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::testing::{context, serial, RecordingUi};
    use crate::surfaces::Surfaces;
    use crate::translation::testing::CountingSource;

    fn toggle(delay_frames: u32, min_interval_ms: u64) -> LanguageToggle {
        let manager = HookManager::with_surfaces(
            context(Arc::new(CountingSource::potions()), Arc::new(RecordingUi::default())),
            Surfaces::all(),
        );
        manager.enable_all();
        LanguageToggle::new(
            ToggleConfig {
                delay_frames,
                min_interval_ms,
            },
            Arc::new(manager),
        )
    }

    #[test]
    fn test_swap_waits_for_delay() {
        let _serial = serial();
        let scheduler = FrameScheduler::new();
        let toggle = toggle(3, 0);

        assert!(toggle.request(&scheduler, ToggleAction::Swap));
        scheduler.tick();
        scheduler.tick();
        assert!(!toggle.manager.is_swapped());
        assert!(toggle.is_pending());

        scheduler.tick();
        assert!(toggle.manager.is_swapped());
        assert!(!toggle.is_pending());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_toggle_alternates() {
        let _serial = serial();
        let scheduler = FrameScheduler::new();
        let toggle = toggle(0, 0);

        toggle.request(&scheduler, ToggleAction::Toggle);
        scheduler.tick();
        assert!(toggle.manager.is_swapped());

        toggle.request(&scheduler, ToggleAction::Toggle);
        scheduler.tick();
        assert!(!toggle.manager.is_swapped());
    }

    #[test]
    fn test_rapid_requests_are_debounced() {
        let _serial = serial();
        let scheduler = FrameScheduler::new();
        let toggle = toggle(1, 60_000);

        assert!(toggle.request(&scheduler, ToggleAction::Toggle));
        assert!(!toggle.request(&scheduler, ToggleAction::Toggle));
        assert_eq!(scheduler.len(), 1);

        scheduler.tick();
        assert!(toggle.manager.is_swapped());
    }

    #[test]
    fn test_newer_request_replaces_pending() {
        let _serial = serial();
        let scheduler = FrameScheduler::new();
        let toggle = toggle(2, 0);

        toggle.request(&scheduler, ToggleAction::Swap);
        toggle.request(&scheduler, ToggleAction::Restore);
        assert_eq!(scheduler.len(), 1);

        scheduler.tick();
        scheduler.tick();
        assert!(!toggle.manager.is_swapped());
        assert!(!toggle.is_pending());
    }

    #[test]
    fn test_cancel_before_run() {
        let _serial = serial();
        let scheduler = FrameScheduler::new();
        let toggle = toggle(2, 0);

        toggle.request(&scheduler, ToggleAction::Swap);
        assert!(toggle.cancel(&scheduler));
        assert!(!toggle.cancel(&scheduler));

        for _ in 0..4 {
            scheduler.tick();
        }
        assert!(!toggle.manager.is_swapped());
    }
}
