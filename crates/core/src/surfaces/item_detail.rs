//! Item tooltip translation
//!
//! The hovered item is captured from the inventory hover notification; the
//! tooltip generator then reads name, glamour name and description from its
//! string array, which is rewritten just before the original runs.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use langswap_sdk::{
    AtkUnitBase, EntityKind, GenerateTooltipFn, InventoryItem, ItemHoveredFn, NumberArrayData,
    StringArrayData,
};

use crate::memory::{read_field, NumberArray, StringArray, TextArena};

use super::{
    guarded, install, log_write, regenerate_if_visible, should_react, uninstall, ActiveSlot,
    HookSetError, HookState, Lifecycle, Surface, SurfaceContext, TranslationHook, Transition,
};

const SURFACE: Surface = Surface::ItemDetail;
const ADDON: &str = "ItemDetail";

crate::interception! {
    /// Item tooltip generation
    static GenerateItemTooltip: GenerateTooltipFn;
    /// Inventory slot hover notification
    static ItemHovered: ItemHoveredFn;
}

static ACTIVE: ActiveSlot<ItemDetailState> = ActiveSlot::new();

struct ItemDetailState {
    ctx: SurfaceContext,
    lifecycle: Lifecycle,
    item_id: AtomicU32,
    glamour_id: AtomicU32,
    arena: TextArena,
}

impl ItemDetailState {
    fn in_range(&self, id: u32) -> bool {
        self.ctx.cache.limits().id_in_range(EntityKind::Item, id)
    }

    /// Adopt the id at the probe index if it is a valid item id
    unsafe fn probe_id(&self, numbers: *const NumberArrayData) -> Option<u32> {
        let numbers = NumberArray::from_raw(numbers, self.ctx.layout.numbers).ok()?;
        let candidate = numbers.get(self.ctx.layout.id_probe).ok()?;
        u32::try_from(candidate).ok().filter(|&id| self.in_range(id))
    }

    unsafe fn on_item_hovered(&self, item: *const InventoryItem) {
        let base = item.cast::<u8>();
        let layout = &self.ctx.layout;

        match read_field::<u32>(base, layout.item_id_offset) {
            Ok(id) => self.item_id.store(id, Ordering::Relaxed),
            Err(e) => {
                tracing::trace!("{}: no hovered item: {}", SURFACE, e);
                return;
            }
        }
        let glamour = read_field::<u32>(base, layout.glamour_id_offset).unwrap_or(0);
        self.glamour_id.store(glamour, Ordering::Relaxed);
    }

    unsafe fn before_generate(&self, numbers: *const NumberArrayData, strings: *mut StringArrayData) {
        let mut item_id = self.item_id.load(Ordering::Relaxed);
        if !self.in_range(item_id) {
            if let Some(probed) = self.probe_id(numbers) {
                item_id = probed;
                self.item_id.store(item_id, Ordering::Relaxed);
            }
        }

        if !self.lifecycle.is_swapped() || !self.in_range(item_id) {
            return;
        }

        let layout = &self.ctx.layout;
        let mut strings = match StringArray::from_raw(strings, layout.strings, &self.arena) {
            Ok(strings) => strings,
            Err(e) => {
                tracing::debug!("{}: no string array: {}", SURFACE, e);
                return;
            }
        };

        let cache = &self.ctx.cache;
        let language = self.ctx.target_language;
        let glyphs = self.ctx.markers.glyphs();

        if let Some(name) = cache.name(EntityKind::Item, item_id, language) {
            let result = strings.set_preserving(layout.item_name_field, &name, &glyphs);
            log_write(SURFACE, "name", item_id, result);
        }

        let glamour_id = self.glamour_id.load(Ordering::Relaxed);
        if self.in_range(glamour_id) {
            if let Some(name) = cache.name(EntityKind::Item, glamour_id, language) {
                let result = strings.set_preserving(layout.glamour_name_field, &name, &glyphs);
                log_write(SURFACE, "glamour name", glamour_id, result);
            }
        }

        if let Some(description) = cache.description(EntityKind::Item, item_id, language) {
            let result = strings.set(layout.item_description_field, &description);
            log_write(SURFACE, "description", item_id, result);
        }
    }
}

unsafe extern "C" fn generate_item_tooltip_detour(
    addon: *mut AtkUnitBase,
    numbers: *mut NumberArrayData,
    strings: *mut StringArrayData,
) -> *mut c_void {
    if let Some(state) = ACTIVE.get() {
        guarded(SURFACE, "GenerateItemTooltip", || state.before_generate(numbers, strings));
    }

    match GENERATE_ITEM_TOOLTIP_HOOK.original() {
        Some(original) => original(addon, numbers, strings),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn item_hovered_detour(
    a1: *mut c_void,
    a2: *mut *mut c_void,
    container_id: *mut i32,
    slot_id: *mut u16,
    a5: *mut c_void,
    slot_id_int: u32,
    item: *mut InventoryItem,
) -> u8 {
    // The host fills the item record inside the original
    let result = match ITEM_HOVERED_HOOK.original() {
        Some(original) => original(a1, a2, container_id, slot_id, a5, slot_id_int, item),
        None => 0,
    };

    if let Some(state) = ACTIVE.get() {
        guarded(SURFACE, "ItemHovered", || state.on_item_hovered(item));
    }
    result
}

/// Translates item names, glamour names and descriptions in item tooltips
pub struct ItemDetailHook {
    state: Arc<ItemDetailState>,
}

impl ItemDetailHook {
    pub fn new(ctx: SurfaceContext) -> Self {
        let arena = TextArena::new(ctx.cache.limits().max_text_bytes);
        Self {
            state: Arc::new(ItemDetailState {
                ctx,
                lifecycle: Lifecycle::new(),
                item_id: AtomicU32::new(0),
                glamour_id: AtomicU32::new(0),
                arena,
            }),
        }
    }

    /// Last captured item and glamour ids
    pub fn current_ids(&self) -> (u32, u32) {
        (
            self.state.item_id.load(Ordering::Relaxed),
            self.state.glamour_id.load(Ordering::Relaxed),
        )
    }

    /// Capture ids from a hovered inventory record
    ///
    /// # Safety
    /// `item` must be null or point to a record laid out as the host layout says.
    pub unsafe fn on_item_hovered(&self, item: *const InventoryItem) {
        self.state.on_item_hovered(item)
    }

    /// Rewrite tooltip fields ahead of the host's generator
    ///
    /// # Safety
    /// Both arrays must be null or live host arrays matching the host layout.
    pub unsafe fn before_generate(&self, numbers: *const NumberArrayData, strings: *mut StringArrayData) {
        self.state.before_generate(numbers, strings)
    }
}

impl TranslationHook for ItemDetailHook {
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
        let hooked = [
            install(SURFACE, &ITEM_HOVERED_HOOK, resolver, item_hovered_detour),
            install(SURFACE, &GENERATE_ITEM_TOOLTIP_HOOK, resolver, generate_item_tooltip_detour),
        ];
        tracing::info!(
            "{} enabled ({}/{} interceptions)",
            SURFACE,
            hooked.iter().filter(|&&ok| ok).count(),
            hooked.len()
        );
        Ok(())
    }

    fn disable(&self) -> Result<(), HookSetError> {
        let transition = Transition::Disable;
        if !should_react(SURFACE, self.state.lifecycle.transition(transition), transition)? {
            return Ok(());
        }

        uninstall(SURFACE, &ITEM_HOVERED_HOOK, false);
        uninstall(SURFACE, &GENERATE_ITEM_TOOLTIP_HOOK, false);
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

        self.state.item_id.store(0, Ordering::Relaxed);
        self.state.glamour_id.store(0, Ordering::Relaxed);
        regenerate_if_visible(SURFACE, self.state.ctx.addons.as_ref(), ADDON);
        Ok(())
    }

    fn dispose(&self) {
        let transition = Transition::Dispose;
        if !matches!(should_react(SURFACE, self.state.lifecycle.transition(transition), transition), Ok(true)) {
            return;
        }

        uninstall(SURFACE, &ITEM_HOVERED_HOOK, true);
        uninstall(SURFACE, &GENERATE_ITEM_TOOLTIP_HOOK, true);
        ACTIVE.clear_if(&self.state);
        tracing::info!("{} disposed", SURFACE);
    }
}
