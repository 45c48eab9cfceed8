//! Translatable UI surfaces
//!
//! Each surface owns the interceptions that rewrite one kind of host UI text
//! and implements [`TranslationHook`]. Bookkeeping common to all of them lives
//! in [`lifecycle`]; the [`HookManager`] drives them as a set.

mod action_detail;
mod cast_bar;
mod item_detail;
mod layout;
pub mod lifecycle;
mod manager;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bitflags::bitflags;
use langswap_engine::AddonHost;
use langswap_sdk::Language;
use parking_lot::RwLock;

use crate::config::MarkerConfig;
use crate::hooks::{self, HookError, Interception, SymbolResolver};
use crate::memory::MemoryError;
use crate::translation::TranslationCache;

pub use action_detail::ActionDetailHook;
pub use cast_bar::CastBarHook;
pub use item_detail::ItemDetailHook;
pub use layout::HostLayout;
pub use lifecycle::{HookState, Lifecycle, Outcome, SwapState, Transition};
pub use manager::HookManager;

/// One translatable UI surface
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    CastBar = 0,
    ActionDetail = 1,
    ItemDetail = 2,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::CastBar, Surface::ActionDetail, Surface::ItemDetail];

    /// Convert a raw surface id as passed over the C ABI
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Surface::CastBar),
            1 => Some(Surface::ActionDetail),
            2 => Some(Surface::ItemDetail),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Surface::CastBar => "CastBar",
            Surface::ActionDetail => "ActionDetail",
            Surface::ItemDetail => "ItemDetail",
        }
    }

    pub fn flag(self) -> Surfaces {
        match self {
            Surface::CastBar => Surfaces::CAST_BAR,
            Surface::ActionDetail => Surfaces::ACTION_DETAIL,
            Surface::ItemDetail => Surfaces::ITEM_DETAIL,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of surfaces
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Surfaces: u8 {
        const CAST_BAR = 1 << 0;
        const ACTION_DETAIL = 1 << 1;
        const ITEM_DETAIL = 1 << 2;
    }
}

impl Surfaces {
    pub fn contains_surface(self, surface: Surface) -> bool {
        self.contains(surface.flag())
    }
}

/// Errors surfaced by hook set operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookSetError {
    #[error("{0} hook is disposed")]
    Disposed(Surface),

    #[error("{0} hook must be enabled first")]
    NotEnabled(Surface),

    #[error("{surface} hook panicked during {operation}")]
    Panicked {
        surface: Surface,
        operation: &'static str,
    },
}

/// Capabilities shared by every surface
///
/// `enable` never fails because a signature is missing; the affected
/// interception is skipped and logged.
pub trait TranslationHook: Send + Sync {
    fn surface(&self) -> Surface;

    fn state(&self) -> HookState;

    fn enable(&self) -> Result<(), HookSetError>;

    fn disable(&self) -> Result<(), HookSetError>;

    /// Start rewriting text and refresh what is on screen
    fn swap_language(&self) -> Result<(), HookSetError>;

    /// Stop rewriting text, forget captured ids and refresh what is on screen
    fn restore_language(&self) -> Result<(), HookSetError>;

    /// Remove every interception. Calling it twice does nothing.
    fn dispose(&self);
}

/// Everything a surface needs from the rest of the core
#[derive(Clone)]
pub struct SurfaceContext {
    pub cache: Arc<TranslationCache>,
    pub addons: Arc<dyn AddonHost>,
    pub resolver: Arc<dyn SymbolResolver>,
    pub layout: HostLayout,
    pub markers: MarkerConfig,
    pub client_language: Language,
    pub target_language: Language,
}

/// Map an outcome to whether the surface must react
fn should_react(surface: Surface, outcome: Outcome, transition: Transition) -> Result<bool, HookSetError> {
    match outcome {
        Outcome::Changed(state) => {
            tracing::debug!("{}: {:?} -> {:?}", surface, transition, state);
            Ok(true)
        }
        Outcome::NoOp => Ok(false),
        Outcome::Rejected if transition == Transition::Swap => Err(HookSetError::NotEnabled(surface)),
        Outcome::Rejected => Err(HookSetError::Disposed(surface)),
    }
}

/// Install or re-enable one interception, logging instead of failing
fn install<F: Copy>(
    surface: Surface,
    interception: &Interception<F>,
    resolver: &dyn SymbolResolver,
    detour: F,
) -> bool {
    // SAFETY: every interception is declared with the host function's signature
    match unsafe { hooks::hook_symbol(interception, resolver, detour) } {
        Ok(()) => {
            tracing::debug!("{}: {} hooked", surface, interception.name());
            true
        }
        Err(e) => {
            tracing::warn!("{}: {} not hooked: {}", surface, interception.name(), e);
            false
        }
    }
}

/// Disable one interception if it was installed
fn uninstall<F: Copy>(surface: Surface, interception: &Interception<F>, remove: bool) {
    let result = if remove {
        interception.remove()
    } else {
        interception.disable()
    };
    match result {
        Ok(()) | Err(HookError::NotFound) => {}
        Err(e) => tracing::error!("{}: failed to unhook {}: {}", surface, interception.name(), e),
    }
}

/// Run a detour body, containing panics so the original still gets called
fn guarded<R>(surface: Surface, operation: &'static str, body: impl FnOnce() -> R) -> Option<R> {
    match std::panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!("{}", HookSetError::Panicked { surface, operation });
            None
        }
    }
}

/// Log the result of a write into a host field
fn log_write(surface: Surface, field: &str, id: u32, result: Result<(), MemoryError>) {
    match result {
        Ok(()) => tracing::debug!("{}: translated {} of {}", surface, field, id),
        Err(e @ MemoryError::OutOfRange { .. }) => {
            tracing::debug!("{}: skipped {} of {}: {}", surface, field, id, e)
        }
        Err(e) => tracing::warn!("{}: skipped {} of {}: {}", surface, field, id, e),
    }
}

/// Refresh an addon if it is on screen
fn regenerate_if_visible(surface: Surface, addons: &dyn AddonHost, addon: &str) {
    if addons.is_visible(addon) && addons.regenerate(addon) {
        tracing::debug!("{}: regenerated {}", surface, addon);
    }
}

/// The surface state detours read from
///
/// Detours are plain functions, so the live state of a surface is published
/// here while it is enabled.
struct ActiveSlot<T>(RwLock<Option<Arc<T>>>);

impl<T> ActiveSlot<T> {
    const fn new() -> Self {
        Self(RwLock::new(None))
    }

    fn get(&self) -> Option<Arc<T>> {
        self.0.read().clone()
    }

    fn set(&self, state: &Arc<T>) {
        *self.0.write() = Some(state.clone());
    }

    fn clear_if(&self, state: &Arc<T>) {
        let mut slot = self.0.write();
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, state)) {
            *slot = None;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::Limits;
    use crate::gamedata::{Gamedata, GamedataError};
    use crate::scanner::ScanError;
    use crate::translation::testing::{CountingSource, PanickingSource};
    use parking_lot::{Mutex, MutexGuard};

    static SERIAL: Mutex<()> = Mutex::new(());

    /// Held by tests that enable surfaces, since interceptions are process-wide
    pub fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock()
    }

    /// Resolver for a host without any of the signatures
    pub struct NoSymbols;

    /// Resolver over a fixed table of signature addresses
    pub struct Symbols(pub Vec<(&'static str, usize)>);

    impl SymbolResolver for Symbols {
        fn resolve(&self, name: &str) -> Result<usize, GamedataError> {
            self.0
                .iter()
                .find(|(symbol, _)| *symbol == name)
                .map(|&(_, address)| address)
                .ok_or_else(|| ScanError::NotFound(name.to_string()).into())
        }
    }

    /// Copy `code` into its own executable page, left mapped
    #[cfg(all(unix, target_arch = "x86_64"))]
    pub fn exec_stub(code: &[u8]) -> usize {
        use nix::sys::mman::{mmap_anonymous, MapFlags, ProtFlags};
        let ptr = unsafe {
            mmap_anonymous(
                None,
                std::num::NonZeroUsize::new(4096).unwrap(),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE | ProtFlags::PROT_EXEC,
                MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
            )
        }
        .unwrap();
        let base = ptr.as_ptr() as *mut u8;
        unsafe {
            std::ptr::write_bytes(base, 0xCC, 4096);
            std::ptr::copy_nonoverlapping(code.as_ptr(), base, code.len());
        }
        base as usize
    }

    /// Cache whose data source panics on every lookup
    pub fn panicking_cache() -> Arc<TranslationCache> {
        Arc::new(TranslationCache::new(Arc::new(PanickingSource), Limits::default()))
    }

    impl SymbolResolver for NoSymbols {
        fn resolve(&self, name: &str) -> Result<usize, GamedataError> {
            Err(ScanError::NotFound(name.to_string()).into())
        }
    }

    /// Addon host recording refresh calls
    #[derive(Default)]
    pub struct RecordingUi {
        pub visible: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingUi {
        pub fn visible() -> Self {
            Self {
                visible: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl AddonHost for RecordingUi {
        fn is_visible(&self, _addon: &str) -> bool {
            self.visible
        }

        fn regenerate(&self, addon: &str) -> bool {
            self.calls.lock().push(format!("regenerate {addon}"));
            true
        }

        fn set_text(&self, addon: &str, text: &str) -> bool {
            self.calls.lock().push(format!("set_text {addon} {text}"));
            true
        }
    }

    pub fn context(source: Arc<CountingSource>, ui: Arc<RecordingUi>) -> SurfaceContext {
        SurfaceContext {
            cache: Arc::new(TranslationCache::new(source, Limits::default())),
            addons: ui,
            resolver: Arc::new(NoSymbols),
            layout: HostLayout::from_gamedata(&Gamedata::builtin().unwrap()).unwrap(),
            markers: MarkerConfig::default(),
            client_language: Language::English,
            target_language: Language::French,
        }
    }
}
