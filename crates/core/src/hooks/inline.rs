//! Inline function detours
//!
//! A detour overwrites the first instructions of a target with a `jmp rel32`
//! into a relay stub that jumps on to the replacement. The overwritten
//! instructions are decoded and re-encoded with iced-x86 into a trampoline
//! which then jumps back into the target, so the original stays callable.
//!
//! ```text
//! target:      jmp relay ; nop padding ; rest of function
//! relay:       jmp [rip+0] -> detour
//! trampoline:  relocated prologue ; jmp [rip+0] -> target + prologue length
//! ```

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use iced_x86::{
    BlockEncoder, BlockEncoderOptions, Decoder, DecoderOptions, FlowControl, Instruction,
    InstructionBlock,
};
use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use super::trampoline;

new_key_type! {
    /// Handle for an inline hook
    pub struct InlineHookKey;
}

/// Error type for hook operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("Invalid address: {0:#x}")]
    InvalidAddress(usize),

    #[error("Address {0:#x} is already hooked")]
    AlreadyHooked(usize),

    #[error("Failed to decode instruction at {0:#x}")]
    Decode(usize),

    #[error("Function at {0:#x} is too short to patch")]
    FunctionTooShort(usize),

    #[error("Instruction relocation failed: {0}")]
    RelocationFailed(String),

    #[error("Failed to allocate trampoline near {0:#x}")]
    TrampolineAlloc(usize),

    #[error("Memory protection failed: {0}")]
    MemoryProtection(String),

    #[error("Hook not found")]
    NotFound,
}

impl From<region::Error> for HookError {
    fn from(err: region::Error) -> Self {
        HookError::MemoryProtection(err.to_string())
    }
}

/// Length of `jmp rel32`
const JMP_REL32_LEN: usize = 5;

/// Length of `jmp [rip+0]` followed by its 64-bit destination
const JMP_ABS_LEN: usize = 14;

/// Offset of the relocated prologue inside a trampoline slot
const ORIGINAL_OFFSET: usize = 16;

/// Bytes reserved per hook for relay, relocated prologue and jump back
const TRAMPOLINE_SIZE: usize = 128;

/// Bytes read from the target when decoding the prologue
const PROLOGUE_WINDOW: usize = 32;

/// Internal storage for an inline hook
struct InlineHookEntry {
    name: String,
    target: usize,
    /// Entry of the relocated prologue
    original: usize,
    original_bytes: Vec<u8>,
    patch: Vec<u8>,
    enabled: bool,
}

static INLINE_HOOKS: LazyLock<RwLock<SlotMap<InlineHookKey, InlineHookEntry>>> =
    LazyLock::new(|| RwLock::new(SlotMap::with_key()));

fn abs_jump(destination: usize) -> [u8; JMP_ABS_LEN] {
    let mut code = [0u8; JMP_ABS_LEN];
    code[..6].copy_from_slice(&[0xFF, 0x25, 0x00, 0x00, 0x00, 0x00]);
    code[6..].copy_from_slice(&(destination as u64).to_le_bytes());
    code
}

/// Decode whole instructions from `target` until at least a `jmp rel32` fits
fn decode_prologue(target: usize) -> Result<(Vec<Instruction>, usize), HookError> {
    // SAFETY: caller guarantees target points into mapped code
    let bytes = unsafe { std::slice::from_raw_parts(target as *const u8, PROLOGUE_WINDOW) };
    let mut decoder = Decoder::with_ip(64, bytes, target as u64, DecoderOptions::NONE);

    let mut instructions = Vec::new();
    let mut length = 0;

    while length < JMP_REL32_LEN {
        if !decoder.can_decode() {
            return Err(HookError::Decode(target + length));
        }

        let instruction = decoder.decode();
        if instruction.is_invalid() {
            return Err(HookError::Decode(target + length));
        }

        length += instruction.len();
        instructions.push(instruction);

        let ends_function = matches!(
            instruction.flow_control(),
            FlowControl::Return | FlowControl::UnconditionalBranch | FlowControl::IndirectBranch
        );
        if ends_function && length < JMP_REL32_LEN {
            return Err(HookError::FunctionTooShort(target));
        }
    }

    Ok((instructions, length))
}

/// Write `bytes` over code at `address`, restoring the previous protection after
///
/// # Safety
/// `address..address + bytes.len()` must be mapped and must not be executing
/// concurrently.
unsafe fn write_code(address: usize, bytes: &[u8]) -> Result<(), HookError> {
    let _guard = region::protect_with_handle(
        address as *const u8,
        bytes.len(),
        region::Protection::READ_WRITE_EXECUTE,
    )?;
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len());
    Ok(())
}

/// Build relay and trampoline for `target`, returning the entry (not yet patched)
///
/// # Safety
/// `target` must be the entry of a function in mapped code.
unsafe fn build_entry(name: &str, target: usize, detour: usize) -> Result<InlineHookEntry, HookError> {
    let (instructions, length) = decode_prologue(target)?;

    let slot = trampoline::alloc_trampoline(target, TRAMPOLINE_SIZE)
        .ok_or(HookError::TrampolineAlloc(target))?;

    let patch = match fill_trampoline(slot.as_ptr() as usize, target, detour, &instructions, length) {
        Ok(patch) => patch,
        Err(e) => {
            trampoline::release_trampoline(slot, TRAMPOLINE_SIZE);
            return Err(e);
        }
    };

    let original_bytes = std::slice::from_raw_parts(target as *const u8, length).to_vec();

    Ok(InlineHookEntry {
        name: name.to_string(),
        target,
        original: slot.as_ptr() as usize + ORIGINAL_OFFSET,
        original_bytes,
        patch,
        enabled: false,
    })
}

/// Write relay and relocated prologue into `slot` and build the target patch
unsafe fn fill_trampoline(
    slot: usize,
    target: usize,
    detour: usize,
    instructions: &[Instruction],
    length: usize,
) -> Result<Vec<u8>, HookError> {
    let relay_rel = (slot as i64) - (target + JMP_REL32_LEN) as i64;
    let relay_rel = i32::try_from(relay_rel).map_err(|_| HookError::TrampolineAlloc(target))?;

    let original = slot + ORIGINAL_OFFSET;
    let relocated = BlockEncoder::encode(
        64,
        InstructionBlock::new(instructions, original as u64),
        BlockEncoderOptions::NONE,
    )
    .map_err(|e| HookError::RelocationFailed(e.to_string()))?
    .code_buffer;

    if ORIGINAL_OFFSET + relocated.len() + JMP_ABS_LEN > TRAMPOLINE_SIZE {
        return Err(HookError::RelocationFailed(format!(
            "relocated prologue of {} bytes does not fit",
            relocated.len()
        )));
    }

    let mut code = Vec::with_capacity(TRAMPOLINE_SIZE);
    code.extend_from_slice(&abs_jump(detour));
    code.resize(ORIGINAL_OFFSET, 0xCC);
    code.extend_from_slice(&relocated);
    code.extend_from_slice(&abs_jump(target + length));
    // The slot is freshly allocated RWX memory nobody executes yet
    std::ptr::copy_nonoverlapping(code.as_ptr(), slot as *mut u8, code.len());

    let mut patch = Vec::with_capacity(length);
    patch.push(0xE9);
    patch.extend_from_slice(&relay_rel.to_le_bytes());
    patch.resize(length, 0x90);
    Ok(patch)
}

/// Create and enable an inline hook
///
/// # Safety
/// - `target` must be the entry of a function in mapped, executable memory
/// - `detour` must be a function with a signature compatible with `target`
///
/// # Returns
/// A key to manage the hook, and the address to call the original function
pub unsafe fn create_inline_hook(
    name: &str,
    target: usize,
    detour: usize,
) -> Result<(InlineHookKey, usize), HookError> {
    if target == 0 {
        return Err(HookError::InvalidAddress(target));
    }
    if detour == 0 {
        return Err(HookError::InvalidAddress(detour));
    }

    let mut hooks = INLINE_HOOKS.write();
    if hooks.values().any(|e| e.target == target) {
        return Err(HookError::AlreadyHooked(target));
    }

    tracing::debug!(
        "Creating inline hook '{}' at {:#x} -> {:#x}",
        name,
        target,
        detour
    );

    let mut entry = build_entry(name, target, detour)?;
    if let Err(e) = write_code(target, &entry.patch) {
        if let Some(slot) = NonNull::new((entry.original - ORIGINAL_OFFSET) as *mut u8) {
            trampoline::release_trampoline(slot, TRAMPOLINE_SIZE);
        }
        return Err(e);
    }
    entry.enabled = true;

    let original = entry.original;
    let key = hooks.insert(entry);

    tracing::info!("Created inline hook '{}' at {:#x}", name, target);
    Ok((key, original))
}

/// Enable an inline hook. Enabling an enabled hook does nothing.
pub fn enable_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get_mut(key).ok_or(HookError::NotFound)?;

    if entry.enabled {
        return Ok(());
    }

    // SAFETY: target was validated when the hook was created
    unsafe { write_code(entry.target, &entry.patch)? };
    entry.enabled = true;

    tracing::info!("Enabled inline hook '{}' at {:#x}", entry.name, entry.target);
    Ok(())
}

/// Disable an inline hook, restoring the target's original bytes
pub fn disable_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get_mut(key).ok_or(HookError::NotFound)?;

    if !entry.enabled {
        return Ok(());
    }

    // SAFETY: original_bytes were read from this exact range
    unsafe { write_code(entry.target, &entry.original_bytes)? };
    entry.enabled = false;

    tracing::info!("Disabled inline hook '{}' at {:#x}", entry.name, entry.target);
    Ok(())
}

/// Remove an inline hook completely
///
/// The trampoline stays mapped so threads still inside it can finish.
pub fn remove_inline_hook(key: InlineHookKey) -> Result<(), HookError> {
    let mut hooks = INLINE_HOOKS.write();
    let entry = hooks.get(key).ok_or(HookError::NotFound)?;

    if entry.enabled {
        // SAFETY: original_bytes were read from this exact range
        unsafe { write_code(entry.target, &entry.original_bytes)? };
    }

    if let Some(entry) = hooks.remove(key) {
        tracing::info!("Removed inline hook '{}' at {:#x}", entry.name, entry.target);
    }
    Ok(())
}

/// Check if an inline hook is enabled
pub fn is_inline_hook_enabled(key: InlineHookKey) -> bool {
    INLINE_HOOKS
        .read()
        .get(key)
        .map(|e| e.enabled)
        .unwrap_or(false)
}

/// Typed, statically declared inline hook
///
/// `F` is the function pointer type of the target. The original is stored as
/// a plain address so detours can read it without locking.
pub struct Interception<F> {
    name: &'static str,
    key: RwLock<Option<InlineHookKey>>,
    original: AtomicUsize,
    _signature: PhantomData<F>,
}

impl<F: Copy> Interception<F> {
    pub const fn new(name: &'static str) -> Self {
        assert!(std::mem::size_of::<F>() == std::mem::size_of::<usize>());
        Self {
            name,
            key: RwLock::new(None),
            original: AtomicUsize::new(0),
            _signature: PhantomData,
        }
    }

    /// Name of the hook, which is also its gamedata signature name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Install and enable the hook at `target`
    ///
    /// # Safety
    /// `target` must be a function whose signature is `F`.
    pub unsafe fn install(&self, target: usize, detour: F) -> Result<(), HookError> {
        let mut slot = self.key.write();
        if slot.is_some() {
            return Err(HookError::AlreadyHooked(target));
        }

        let detour: usize = std::mem::transmute_copy(&detour);
        let (key, original) = create_inline_hook(self.name, target, detour)?;
        self.original.store(original, Ordering::Release);
        *slot = Some(key);
        Ok(())
    }

    /// The original function, if installed
    pub fn original(&self) -> Option<F> {
        let address = self.original.load(Ordering::Acquire);
        if address == 0 {
            return None;
        }
        // SAFETY: F is a function pointer type of the same size as usize
        Some(unsafe { std::mem::transmute_copy::<usize, F>(&address) })
    }

    pub fn is_installed(&self) -> bool {
        self.key.read().is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.key.read().map(is_inline_hook_enabled).unwrap_or(false)
    }

    pub fn enable(&self) -> Result<(), HookError> {
        match *self.key.read() {
            Some(key) => enable_inline_hook(key),
            None => Err(HookError::NotFound),
        }
    }

    pub fn disable(&self) -> Result<(), HookError> {
        match *self.key.read() {
            Some(key) => disable_inline_hook(key),
            None => Err(HookError::NotFound),
        }
    }

    /// Remove the hook. Removing an uninstalled hook does nothing.
    pub fn remove(&self) -> Result<(), HookError> {
        let mut slot = self.key.write();
        if let Some(key) = *slot {
            remove_inline_hook(key)?;
            *slot = None;
        }
        self.original.store(0, Ordering::Release);
        Ok(())
    }
}

/// Declare a static [`Interception`] whose name doubles as its signature name
///
/// # Example
/// ```ignore
/// interception! {
///     /// Item tooltip generation
///     static GenerateItemTooltip: GenerateTooltipFn;
/// }
/// // expands to `static GENERATE_ITEM_TOOLTIP_HOOK: Interception<GenerateTooltipFn>`
/// ```
#[macro_export]
macro_rules! interception {
    ($(
        $(#[$meta:meta])*
        $vis:vis static $name:ident: $signature:ty;
    )+) => {
        $(
            $crate::paste::paste! {
                $(#[$meta])*
                $vis static [<$name:snake:upper _HOOK>]: $crate::hooks::Interception<$signature> =
                    $crate::hooks::Interception::new(stringify!($name));
            }
        )+
    };
}
