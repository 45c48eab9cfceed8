//! Action tooltip translation

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use langswap_sdk::{AtkUnitBase, EntityKind, GenerateTooltipFn, NumberArrayData, StringArrayData};

use crate::memory::{NumberArray, StringArray, TextArena};

use super::{
    guarded, install, log_write, regenerate_if_visible, should_react, uninstall, ActiveSlot,
    HookSetError, HookState, Lifecycle, Surface, SurfaceContext, TranslationHook, Transition,
};

const SURFACE: Surface = Surface::ActionDetail;
const ADDON: &str = "ActionDetail";

crate::interception! {
    /// Action tooltip generation
    static GenerateActionTooltip: GenerateTooltipFn;
}

static ACTIVE: ActiveSlot<ActionDetailState> = ActiveSlot::new();

struct ActionDetailState {
    ctx: SurfaceContext,
    lifecycle: Lifecycle,
    action_id: AtomicU32,
    arena: TextArena,
}

impl ActionDetailState {
    fn in_range(&self, id: u32) -> bool {
        self.ctx.cache.limits().id_in_range(EntityKind::Action, id)
    }

    unsafe fn before_generate(&self, numbers: *const NumberArrayData, strings: *mut StringArrayData) {
        let layout = &self.ctx.layout;

        // The generator is handed the action id in its number array every time
        let probed = NumberArray::from_raw(numbers, layout.numbers)
            .and_then(|numbers| numbers.get(layout.id_probe))
            .ok()
            .and_then(|id| u32::try_from(id).ok())
            .filter(|&id| self.in_range(id));
        if let Some(id) = probed {
            self.action_id.store(id, Ordering::Relaxed);
        }

        let action_id = self.action_id.load(Ordering::Relaxed);
        tracing::trace!(
            "{}: generating, swapped={}, action={}",
            SURFACE,
            self.lifecycle.is_swapped(),
            action_id
        );
        if !self.lifecycle.is_swapped() || !self.in_range(action_id) {
            return;
        }

        let mut strings = match StringArray::from_raw(strings, layout.strings, &self.arena) {
            Ok(strings) => strings,
            Err(e) => {
                tracing::debug!("{}: no string array: {}", SURFACE, e);
                return;
            }
        };

        let cache = &self.ctx.cache;
        let language = self.ctx.target_language;

        if let Some(name) = cache.name(EntityKind::Action, action_id, language) {
            let glyphs = self.ctx.markers.glyphs();
            let result = strings.set_preserving(layout.action_name_field, &name, &glyphs);
            log_write(SURFACE, "name", action_id, result);
        }

        if let Some(description) = cache.description(EntityKind::Action, action_id, language) {
            let result = strings.set(layout.action_description_field, &description);
            log_write(SURFACE, "description", action_id, result);
        }
    }
}

unsafe extern "C" fn generate_action_tooltip_detour(
    addon: *mut AtkUnitBase,
    numbers: *mut NumberArrayData,
    strings: *mut StringArrayData,
) -> *mut c_void {
    if let Some(state) = ACTIVE.get() {
        guarded(SURFACE, "GenerateActionTooltip", || state.before_generate(numbers, strings));
    }

    match GENERATE_ACTION_TOOLTIP_HOOK.original() {
        Some(original) => original(addon, numbers, strings),
        None => std::ptr::null_mut(),
    }
}

/// Translates action names and descriptions in action tooltips
pub struct ActionDetailHook {
    state: Arc<ActionDetailState>,
}

impl ActionDetailHook {
    pub fn new(ctx: SurfaceContext) -> Self {
        let arena = TextArena::new(ctx.cache.limits().max_text_bytes);
        Self {
            state: Arc::new(ActionDetailState {
                ctx,
                lifecycle: Lifecycle::new(),
                action_id: AtomicU32::new(0),
                arena,
            }),
        }
    }

    pub fn current_id(&self) -> u32 {
        self.state.action_id.load(Ordering::Relaxed)
    }

    /// Rewrite tooltip fields ahead of the host's generator
    ///
    /// # Safety
    /// Both arrays must be null or live host arrays matching the host layout.
    pub unsafe fn before_generate(&self, numbers: *const NumberArrayData, strings: *mut StringArrayData) {
        self.state.before_generate(numbers, strings)
    }
}

impl TranslationHook for ActionDetailHook {
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
        if install(SURFACE, &GENERATE_ACTION_TOOLTIP_HOOK, resolver, generate_action_tooltip_detour) {
            tracing::info!("{} enabled", SURFACE);
        }
        Ok(())
    }

    fn disable(&self) -> Result<(), HookSetError> {
        let transition = Transition::Disable;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        uninstall(SURFACE, &GENERATE_ACTION_TOOLTIP_HOOK, false);
        tracing::info!("{} disabled", SURFACE);
        Ok(())
    }

    fn swap_language(&self) -> Result<(), HookSetError> {
        let transition = Transition::Swap;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        regenerate_if_visible(SURFACE, self.state.ctx.addons.as_ref(), ADDON);
        Ok(())
    }

    fn restore_language(&self) -> Result<(), HookSetError> {
        let transition = Transition::Restore;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        self.state.action_id.store(0, Ordering::Relaxed);
        regenerate_if_visible(SURFACE, self.state.ctx.addons.as_ref(), ADDON);
        Ok(())
    }

    fn dispose(&self) {
        let transition = Transition::Dispose;
        if !matches!(should_react(SURFACE, self.state.lifecycle.transition(transition), transition), Ok(true)) {
            return;
        }

        uninstall(SURFACE, &GENERATE_ACTION_TOOLTIP_HOOK, true);
        ACTIVE.clear_if(&self.state);
        tracing::info!("{} disposed", SURFACE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::{FakeNumberArray, FakeStringArray};
    use crate::surfaces::testing::{context, serial, RecordingUi};
    use crate::translation::testing::CountingSource;

    fn tooltip() -> FakeStringArray {
        let mut fields = vec![""; 14];
        fields[0] = "Fire";
        fields[13] = "Deals fire damage.";
        FakeStringArray::new(&fields)
    }

    #[test]
    fn test_name_then_description() {
        let _serial = serial();
        let source = Arc::new(CountingSource::potions());
        let hook = ActionDetailHook::new(context(source.clone(), Arc::new(RecordingUi::default())));
        hook.enable().unwrap();
        hook.swap_language().unwrap();

        let numbers = FakeNumberArray::new(&[7]);
        let mut strings = tooltip();
        unsafe { hook.before_generate(numbers.as_ptr(), strings.as_ptr()) };

        assert_eq!(hook.current_id(), 7);
        assert_eq!(strings.text(0), "Feu");
        assert_eq!(strings.text(13), "Inflige des dégâts de feu.");
        assert_eq!(source.calls(), 1);
        hook.dispose();
    }

    #[test]
    fn test_idle_hook_captures_but_does_not_write() {
        let _serial = serial();
        let source = Arc::new(CountingSource::potions());
        let hook = ActionDetailHook::new(context(source.clone(), Arc::new(RecordingUi::default())));
        hook.enable().unwrap();

        let numbers = FakeNumberArray::new(&[7]);
        let mut strings = tooltip();
        unsafe { hook.before_generate(numbers.as_ptr(), strings.as_ptr()) };

        assert_eq!(hook.current_id(), 7);
        assert_eq!(strings.text(0), "Fire");
        assert_eq!(source.calls(), 0);
        hook.dispose();
    }

    #[test]
    fn test_missing_translation_leaves_text() {
        let _serial = serial();
        let source = Arc::new(CountingSource::potions());
        let hook = ActionDetailHook::new(context(source.clone(), Arc::new(RecordingUi::default())));
        hook.enable().unwrap();
        hook.swap_language().unwrap();

        let numbers = FakeNumberArray::new(&[8]);
        let mut strings = tooltip();
        unsafe { hook.before_generate(numbers.as_ptr(), strings.as_ptr()) };
        assert_eq!(strings.text(0), "Fire");
        assert_eq!(strings.text(13), "Deals fire damage.");
        hook.dispose();
    }

    #[test]
    fn test_refresh_only_when_visible() {
        let _serial = serial();
        let hidden = Arc::new(RecordingUi::default());
        let hook = ActionDetailHook::new(context(Arc::new(CountingSource::potions()), hidden.clone()));
        hook.enable().unwrap();
        hook.swap_language().unwrap();
        assert!(hidden.calls().is_empty());
        hook.dispose();

        let shown = Arc::new(RecordingUi::visible());
        let hook = ActionDetailHook::new(context(Arc::new(CountingSource::potions()), shown.clone()));
        hook.enable().unwrap();
        hook.swap_language().unwrap();
        hook.restore_language().unwrap();
        assert_eq!(shown.calls(), vec!["regenerate ActionDetail", "regenerate ActionDetail"]);
        hook.dispose();
    }

    #[cfg(all(unix, target_arch = "x86_64"))]
    #[test]
    fn test_detour_rewrites_then_calls_original() {
        use crate::surfaces::testing::{exec_stub, panicking_cache, Symbols};
        use crate::translation::TranslationCache;

        let _serial = serial();
        // mov rax, rdi ; nop ; nop ; ret
        let target = exec_stub(&[0x48, 0x89, 0xF8, 0x90, 0x90, 0xC3]);
        let generate: GenerateTooltipFn = unsafe { std::mem::transmute(target) };
        let addon = 0x1234 as *mut AtkUnitBase;
        let numbers = FakeNumberArray::new(&[7]);

        let with_cache = |cache: Option<Arc<TranslationCache>>| {
            let mut ctx = context(Arc::new(CountingSource::potions()), Arc::new(RecordingUi::default()));
            ctx.resolver = Arc::new(Symbols(vec![("GenerateActionTooltip", target)]));
            if let Some(cache) = cache {
                ctx.cache = cache;
            }
            let hook = ActionDetailHook::new(ctx);
            hook.enable().unwrap();
            hook.swap_language().unwrap();
            assert!(GENERATE_ACTION_TOOLTIP_HOOK.is_enabled());
            hook
        };

        // A failing lookup leaves the text alone and still reaches the host
        let hook = with_cache(Some(panicking_cache()));
        let mut strings = tooltip();
        let result = unsafe { generate(addon, numbers.as_ptr(), strings.as_ptr()) };
        assert_eq!(result, addon.cast::<c_void>());
        assert_eq!(strings.text(0), "Fire");
        assert_eq!(hook.current_id(), 7);
        hook.dispose();
        assert!(!GENERATE_ACTION_TOOLTIP_HOOK.is_installed());

        let hook = with_cache(None);
        let mut strings = tooltip();
        let result = unsafe { generate(addon, numbers.as_ptr(), strings.as_ptr()) };
        assert_eq!(result, addon.cast::<c_void>());
        assert_eq!(strings.text(0), "Feu");
        assert_eq!(strings.text(13), "Inflige des dégâts de feu.");
        hook.dispose();

        // Unpatched again
        let mut strings = tooltip();
        assert_eq!(unsafe { generate(addon, numbers.as_ptr(), strings.as_ptr()) }, addon.cast::<c_void>());
        assert_eq!(strings.text(0), "Fire");
    }
}
