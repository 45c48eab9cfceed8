//! Hook manager
//!
//! Owns one hook per surface and drives the active ones as a set. A failure
//! or panic in one hook is logged and never stops the broadcast to the rest.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    ActionDetailHook, CastBarHook, HookSetError, HookState, ItemDetailHook, Surface,
    SurfaceContext, Surfaces, SwapState, TranslationHook,
};

struct ManagerState {
    active: Surfaces,
    swap: SwapState,
    disposed: bool,
}

/// Aggregate lifecycle controller for every surface
pub struct HookManager {
    hooks: Vec<Arc<dyn TranslationHook>>,
    state: Mutex<ManagerState>,
}

impl HookManager {
    /// Manage `hooks`, of which the surfaces in `active` take part in
    /// broadcasts
    pub fn new(hooks: Vec<Arc<dyn TranslationHook>>, active: Surfaces) -> Self {
        Self {
            hooks,
            state: Mutex::new(ManagerState {
                active,
                swap: SwapState::Idle,
                disposed: false,
            }),
        }
    }

    /// Manager over the built-in surfaces
    pub fn with_surfaces(ctx: SurfaceContext, active: Surfaces) -> Self {
        let hooks: Vec<Arc<dyn TranslationHook>> = vec![
            Arc::new(CastBarHook::new(ctx.clone())),
            Arc::new(ActionDetailHook::new(ctx.clone())),
            Arc::new(ItemDetailHook::new(ctx)),
        ];
        Self::new(hooks, active)
    }

    pub fn hook(&self, surface: Surface) -> Option<Arc<dyn TranslationHook>> {
        self.hooks.iter().find(|h| h.surface() == surface).cloned()
    }

    /// Hooks taking part in broadcasts, or nothing once disposed
    fn active_hooks(&self) -> Vec<Arc<dyn TranslationHook>> {
        let state = self.state.lock();
        if state.disposed {
            return Vec::new();
        }
        self.hooks
            .iter()
            .filter(|h| state.active.contains_surface(h.surface()))
            .cloned()
            .collect()
    }

    /// Active surfaces and their states
    pub fn surfaces(&self) -> Vec<(Surface, HookState)> {
        self.active_hooks()
            .iter()
            .map(|h| (h.surface(), h.state()))
            .collect()
    }

    pub fn is_swapped(&self) -> bool {
        self.state.lock().swap == SwapState::Swapped
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn enable_all(&self) {
        let swapped = self.is_swapped();
        for hook in self.active_hooks() {
            Self::bring_up(&hook, swapped);
        }
    }

    pub fn disable_all(&self) {
        for hook in self.active_hooks() {
            run(hook.as_ref(), "disable", |h| h.disable());
        }
    }

    pub fn swap_language(&self) {
        if !self.set_swap(SwapState::Swapped) {
            return;
        }
        tracing::info!("Swapping language");
        for hook in self.active_hooks() {
            if hook.state().is_enabled() {
                run(hook.as_ref(), "swap language", |h| h.swap_language());
            }
        }
    }

    pub fn restore_language(&self) {
        if !self.set_swap(SwapState::Idle) {
            return;
        }
        tracing::info!("Restoring language");
        for hook in self.active_hooks() {
            run(hook.as_ref(), "restore language", |h| h.restore_language());
        }
    }

    /// Add a surface to the active set and enable it
    ///
    /// Returns `false` if it was already active.
    pub fn enable_surface(&self, surface: Surface) -> bool {
        let swapped = {
            let mut state = self.state.lock();
            if state.disposed || state.active.contains_surface(surface) {
                return false;
            }
            state.active.insert(surface.flag());
            state.swap == SwapState::Swapped
        };

        if let Some(hook) = self.hook(surface) {
            Self::bring_up(&hook, swapped);
        }
        true
    }

    /// Restore and disable a surface, removing it from the active set
    ///
    /// Returns `false` if it was not active.
    pub fn disable_surface(&self, surface: Surface) -> bool {
        {
            let mut state = self.state.lock();
            if state.disposed || !state.active.contains_surface(surface) {
                return false;
            }
            state.active.remove(surface.flag());
        }

        if let Some(hook) = self.hook(surface) {
            run(hook.as_ref(), "restore language", |h| h.restore_language());
            run(hook.as_ref(), "disable", |h| h.disable());
        }
        true
    }

    /// Disable and release every hook exactly once
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }

        for hook in &self.hooks {
            run(hook.as_ref(), "disable", |h| h.disable());
            run(hook.as_ref(), "dispose", |h| {
                h.dispose();
                Ok(())
            });
        }
        tracing::info!("Hook manager disposed");
    }

    fn set_swap(&self, swap: SwapState) -> bool {
        let mut state = self.state.lock();
        if state.disposed {
            tracing::warn!("Ignoring language change after dispose");
            return false;
        }
        state.swap = swap;
        true
    }

    fn bring_up(hook: &Arc<dyn TranslationHook>, swapped: bool) {
        run(hook.as_ref(), "enable", |h| h.enable());
        if swapped && hook.state().is_enabled() {
            run(hook.as_ref(), "swap language", |h| h.swap_language());
        }
    }
}

impl Drop for HookManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Run one hook operation, logging errors and panics
fn run(
    hook: &dyn TranslationHook,
    operation: &str,
    op: impl FnOnce(&dyn TranslationHook) -> Result<(), HookSetError>,
) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| op(hook))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Failed to {} {}: {}", operation, hook.surface(), e),
        Err(_) => tracing::error!("{} panicked during {}", hook.surface(), operation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::lifecycle::{Lifecycle, Outcome, Transition};
    use crate::surfaces::testing::{context, serial, RecordingUi};
    use crate::translation::testing::CountingSource;

    /// Hook recording the calls it receives
    struct FakeHook {
        surface: Surface,
        lifecycle: Lifecycle,
        calls: Mutex<Vec<&'static str>>,
        fail_enable: bool,
        panic_on_swap: bool,
    }

    impl FakeHook {
        fn new(surface: Surface) -> Self {
            Self {
                surface,
                lifecycle: Lifecycle::new(),
                calls: Mutex::new(Vec::new()),
                fail_enable: false,
                panic_on_swap: false,
            }
        }

        fn step(&self, name: &'static str, transition: Transition) -> Result<(), HookSetError> {
            self.calls.lock().push(name);
            match self.lifecycle.transition(transition) {
                Outcome::Rejected => Err(HookSetError::Disposed(self.surface)),
                _ => Ok(()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }
    }

    impl TranslationHook for FakeHook {
        fn surface(&self) -> Surface {
            self.surface
        }

        fn state(&self) -> HookState {
            self.lifecycle.state()
        }

        fn enable(&self) -> Result<(), HookSetError> {
            if self.fail_enable {
                self.calls.lock().push("enable");
                return Err(HookSetError::Disposed(self.surface));
            }
            self.step("enable", Transition::Enable)
        }

        fn disable(&self) -> Result<(), HookSetError> {
            self.step("disable", Transition::Disable)
        }

        fn swap_language(&self) -> Result<(), HookSetError> {
            if self.panic_on_swap {
                panic!("swap failed");
            }
            self.step("swap", Transition::Swap)
        }

        fn restore_language(&self) -> Result<(), HookSetError> {
            self.step("restore", Transition::Restore)
        }

        fn dispose(&self) {
            let _ = self.step("dispose", Transition::Dispose);
        }
    }

    fn fakes() -> (Arc<FakeHook>, Arc<FakeHook>, Arc<FakeHook>) {
        (
            Arc::new(FakeHook::new(Surface::CastBar)),
            Arc::new(FakeHook::new(Surface::ActionDetail)),
            Arc::new(FakeHook::new(Surface::ItemDetail)),
        )
    }

    fn manager(hooks: &(Arc<FakeHook>, Arc<FakeHook>, Arc<FakeHook>), active: Surfaces) -> HookManager {
        HookManager::new(
            vec![hooks.0.clone(), hooks.1.clone(), hooks.2.clone()],
            active,
        )
    }

    #[test]
    fn test_only_active_surfaces_are_driven() {
        let hooks = fakes();
        let manager = manager(&hooks, Surfaces::CAST_BAR | Surfaces::ITEM_DETAIL);

        manager.enable_all();
        manager.swap_language();

        assert_eq!(hooks.0.calls(), vec!["enable", "swap"]);
        assert!(hooks.1.calls().is_empty());
        assert_eq!(hooks.2.calls(), vec!["enable", "swap"]);
        assert!(manager.is_swapped());
        assert_eq!(manager.surfaces().len(), 2);
    }

    #[test]
    fn test_failing_hook_does_not_stop_broadcast() {
        let (mut cast_bar, action, item) = (
            FakeHook::new(Surface::CastBar),
            Arc::new(FakeHook::new(Surface::ActionDetail)),
            Arc::new(FakeHook::new(Surface::ItemDetail)),
        );
        cast_bar.fail_enable = true;
        let cast_bar = Arc::new(cast_bar);

        let manager = HookManager::new(
            vec![cast_bar.clone(), action.clone(), item.clone()],
            Surfaces::all(),
        );
        manager.enable_all();

        assert_eq!(cast_bar.state(), HookState::Disabled);
        assert!(action.state().is_enabled());
        assert!(item.state().is_enabled());
    }

    #[test]
    fn test_panicking_hook_does_not_stop_broadcast() {
        let (cast_bar, action, mut item) = (
            Arc::new(FakeHook::new(Surface::CastBar)),
            Arc::new(FakeHook::new(Surface::ActionDetail)),
            FakeHook::new(Surface::ItemDetail),
        );
        item.panic_on_swap = true;
        let item = Arc::new(item);

        let manager = HookManager::new(
            vec![item.clone(), cast_bar.clone(), action.clone()],
            Surfaces::all(),
        );
        manager.enable_all();
        manager.swap_language();

        assert!(cast_bar.state().is_swapped());
        assert!(action.state().is_swapped());
    }

    #[test]
    fn test_surface_enabled_while_swapped_joins_swapped() {
        let hooks = fakes();
        let manager = manager(&hooks, Surfaces::CAST_BAR);
        manager.enable_all();
        manager.swap_language();

        assert!(manager.enable_surface(Surface::ItemDetail));
        assert!(!manager.enable_surface(Surface::ItemDetail));
        assert!(hooks.2.state().is_swapped());

        assert!(manager.disable_surface(Surface::ItemDetail));
        assert!(!manager.disable_surface(Surface::ItemDetail));
        assert_eq!(hooks.2.state(), HookState::Disabled);
        assert_eq!(hooks.2.calls(), vec!["enable", "swap", "restore", "disable"]);
    }

    #[test]
    fn test_disable_all_keeps_hooks_reusable() {
        let hooks = fakes();
        let manager = manager(&hooks, Surfaces::all());
        manager.enable_all();
        manager.disable_all();

        for hook in [&hooks.0, &hooks.1, &hooks.2] {
            assert_eq!(hook.state(), HookState::Disabled);
        }

        manager.enable_all();
        assert!(manager.surfaces().iter().all(|(_, state)| state.is_enabled()));
    }

    #[test]
    fn test_dispose_once() {
        let hooks = fakes();
        let manager = manager(&hooks, Surfaces::all());
        manager.enable_all();

        manager.dispose();
        manager.dispose();
        drop(manager);

        for hook in [&hooks.0, &hooks.1, &hooks.2] {
            assert_eq!(hook.state(), HookState::Disposed);
            assert_eq!(hook.calls(), vec!["enable", "disable", "dispose"]);
        }
    }

    #[test]
    fn test_calls_after_dispose_are_ignored() {
        let hooks = fakes();
        let manager = manager(&hooks, Surfaces::all());
        manager.dispose();

        manager.enable_all();
        manager.swap_language();
        assert!(!manager.enable_surface(Surface::CastBar));
        assert!(!manager.is_swapped());
        assert!(manager.surfaces().is_empty());
    }

    #[test]
    fn test_builtin_surfaces_follow_manager() {
        let _serial = serial();
        let ui = Arc::new(RecordingUi::visible());
        let manager = HookManager::with_surfaces(
            context(Arc::new(CountingSource::potions()), ui.clone()),
            Surfaces::ACTION_DETAIL | Surfaces::ITEM_DETAIL,
        );
        manager.enable_all();
        manager.swap_language();

        let states = manager.surfaces();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|(_, state)| state.is_swapped()));
        assert_eq!(
            manager.hook(Surface::CastBar).unwrap().state(),
            HookState::Disabled
        );
        assert!(ui.calls().contains(&"regenerate ItemDetail".to_string()));

        manager.restore_language();
        assert!(manager.surfaces().iter().all(|(_, state)| !state.is_swapped()));

        manager.dispose();
        for surface in Surface::ALL {
            assert_eq!(manager.hook(surface).unwrap().state(), HookState::Disposed);
        }
    }
}
