//! Cast bar translation
//!
//! The host passes the action name to the cast bar as a pointer argument.
//! While swapped, that argument is replaced with a translated copy owned by
//! this surface. Each cast bar alternates between two buffers, so the name
//! handed over on one update outlives the next update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use langswap_sdk::{CastBar, EntityKind, Language, UpdateCastBarFn};

use crate::memory::TextArena;

use super::{
    guarded, install, should_react, uninstall, ActiveSlot, HookSetError, HookState, Lifecycle,
    Surface, SurfaceContext, TranslationHook, Transition,
};

const SURFACE: Surface = Surface::CastBar;
const ADDON: &str = "_CastBar";

crate::interception! {
    /// Cast bar update with the action being cast
    static UpdateCastBar: UpdateCastBarFn;
}

static ACTIVE: ActiveSlot<CastBarState> = ActiveSlot::new();

struct CastBarState {
    ctx: SurfaceContext,
    lifecycle: Lifecycle,
    action_id: AtomicU32,
    arena: TextArena,
    /// Arena slot last used per cast bar
    slots: Mutex<HashMap<usize, usize>>,
}

impl CastBarState {
    fn in_range(&self, id: u32) -> bool {
        self.ctx.cache.limits().id_in_range(EntityKind::Action, id)
    }

    fn next_slot(&self, cast_bar: usize) -> usize {
        let mut slots = self.slots.lock();
        let slot = slots.entry(cast_bar).or_insert(1);
        *slot ^= 1;
        *slot
    }

    /// Record the cast and return a replacement name pointer when swapped
    fn on_update(&self, cast_bar: usize, action_id: u32) -> Option<*const u8> {
        self.action_id.store(action_id, Ordering::Relaxed);

        if !self.lifecycle.is_swapped() || !self.in_range(action_id) {
            return None;
        }

        let name = self
            .ctx
            .cache
            .name(EntityKind::Action, action_id, self.ctx.target_language)?;

        match self.arena.store(cast_bar, self.next_slot(cast_bar), name.as_bytes()) {
            Ok(ptr) => {
                tracing::debug!("{}: casting {} as {}", SURFACE, action_id, name);
                Some(ptr)
            }
            Err(e) => {
                tracing::warn!("{}: skipped name of {}: {}", SURFACE, action_id, e);
                None
            }
        }
    }

    /// Write the current cast's name in `language` into the visible cast bar
    fn refresh(&self, language: Language) {
        let action_id = self.action_id.load(Ordering::Relaxed);
        if !self.in_range(action_id) || !self.ctx.addons.is_visible(ADDON) {
            return;
        }

        if let Some(name) = self.ctx.cache.name(EntityKind::Action, action_id, language) {
            if self.ctx.addons.set_text(ADDON, &name) {
                tracing::debug!("{}: updated text to {}", SURFACE, name);
            }
        }
    }
}

unsafe extern "C" fn update_cast_bar_detour(cast_bar: *mut CastBar, action_id: u32, name: *const u8) {
    let replacement = ACTIVE
        .get()
        .and_then(|state| guarded(SURFACE, "UpdateCastBar", || state.on_update(cast_bar as usize, action_id)))
        .flatten();

    if let Some(original) = UPDATE_CAST_BAR_HOOK.original() {
        original(cast_bar, action_id, replacement.unwrap_or(name));
    }
}

/// Translates the name of the action being cast
pub struct CastBarHook {
    state: Arc<CastBarState>,
}

impl CastBarHook {
    pub fn new(ctx: SurfaceContext) -> Self {
        let arena = TextArena::new(ctx.cache.limits().max_text_bytes);
        Self {
            state: Arc::new(CastBarState {
                ctx,
                lifecycle: Lifecycle::new(),
                action_id: AtomicU32::new(0),
                arena,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn current_id(&self) -> u32 {
        self.state.action_id.load(Ordering::Relaxed)
    }

    /// Handle a cast bar update, returning the name pointer to pass on
    ///
    /// The returned pointer stays valid until the second next update of the
    /// same cast bar.
    pub fn on_update(&self, cast_bar: *mut CastBar, action_id: u32, name: *const u8) -> *const u8 {
        self.state
            .on_update(cast_bar as usize, action_id)
            .unwrap_or(name)
    }
}

impl TranslationHook for CastBarHook {
    fn surface(&self) -> Surface {
        SURFACE
    }

    fn state(&self) -> HookState {
        self.state.lifecycle.state()
    }

    fn enable(&self) -> Result<(), HookSetError> {
        let transition = Transition::Enable;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        ACTIVE.set(&self.state);
        let resolver = self.state.ctx.resolver.as_ref();
        if install(SURFACE, &UPDATE_CAST_BAR_HOOK, resolver, update_cast_bar_detour) {
            tracing::info!("{} enabled", SURFACE);
        }
        Ok(())
    }

    fn disable(&self) -> Result<(), HookSetError> {
        let transition = Transition::Disable;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        uninstall(SURFACE, &UPDATE_CAST_BAR_HOOK, false);
        tracing::info!("{} disabled", SURFACE);
        Ok(())
    }

    fn swap_language(&self) -> Result<(), HookSetError> {
        let transition = Transition::Swap;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        self.state.refresh(self.state.ctx.target_language);
        Ok(())
    }

    fn restore_language(&self) -> Result<(), HookSetError> {
        let transition = Transition::Restore;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        self.state.refresh(self.state.ctx.client_language);
        self.state.action_id.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn dispose(&self) {
        let transition = Transition::Dispose;
        if !matches!(should_react(SURFACE, self.state.lifecycle.transition(transition), transition), Ok(true)) {
            return;
        }

        uninstall(SURFACE, &UPDATE_CAST_BAR_HOOK, true);
        ACTIVE.clear_if(&self.state);
        tracing::info!("{} disposed", SURFACE);
    }
}
