//! Trampoline memory allocation
//!
//! Detours patch a 5-byte `jmp rel32`, so the relay a target jumps to must live
//! within ±2GB of it. Pages are carved into small aligned slots and never
//! returned to the OS: a thread may still be executing a relocated prologue
//! after its hook was removed. A slot released before its hook was ever
//! patched in goes back on a free list and is handed out again.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ptr::NonNull;

/// Slot alignment inside a page
const SLOT_ALIGN: usize = 16;

/// Maximum distance reachable with a rel32 displacement
pub const MAX_RANGE: usize = 0x7FFF_0000;

/// Step between allocation hints when searching for a nearby page
const HINT_STEP_PAGES: usize = 64;

static ALLOCATOR: Mutex<TrampolineAllocator> = Mutex::new(TrampolineAllocator::new());

struct TrampolineAllocator {
    /// Executable pages keyed by base address
    pages: BTreeMap<usize, Page>,
    /// Released slots as (address, rounded size)
    free: Vec<(usize, usize)>,
}

struct Page {
    base: *mut u8,
    size: usize,
    used: usize,
}

// SAFETY: pages are only touched while ALLOCATOR is locked
unsafe impl Send for Page {}

/// Distance between two addresses regardless of order
pub fn distance(a: usize, b: usize) -> usize {
    a.abs_diff(b)
}

fn page_size() -> usize {
    region::page::size()
}

impl TrampolineAllocator {
    const fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            free: Vec::new(),
        }
    }

    fn alloc_near(&mut self, target: usize, size: usize) -> Option<NonNull<u8>> {
        let size = size.next_multiple_of(SLOT_ALIGN);

        if let Some(index) = self
            .free
            .iter()
            .position(|&(addr, len)| len >= size && distance(addr, target) < MAX_RANGE)
        {
            let (addr, _) = self.free.swap_remove(index);
            return NonNull::new(addr as *mut u8);
        }

        for (&base, page) in &mut self.pages {
            if distance(base, target) < MAX_RANGE && page.used + size <= page.size {
                // SAFETY: used + size stays inside the mapped page
                let ptr = unsafe { page.base.add(page.used) };
                page.used += size;
                return NonNull::new(ptr);
            }
        }

        let page_len = size.next_multiple_of(page_size());
        let base = self.map_page_near(target, page_len)?;
        self.pages.insert(
            base as usize,
            Page {
                base,
                size: page_len,
                used: size,
            },
        );
        NonNull::new(base)
    }

    fn release(&mut self, addr: usize, size: usize) {
        let size = size.next_multiple_of(SLOT_ALIGN);

        let Some((_, page)) = self.pages.range_mut(..=addr).next_back() else {
            return;
        };
        let base = page.base as usize;
        if addr < base || addr + size > base + page.used {
            tracing::warn!("Ignoring release of unknown trampoline slot {:#x}", addr);
            return;
        }

        if addr + size == base + page.used {
            page.used -= size;
        } else {
            self.free.push((addr, size));
        }
    }

    #[cfg(unix)]
    fn map_page_near(&mut self, target: usize, len: usize) -> Option<*mut u8> {
        use nix::sys::mman::{mmap_anonymous, munmap, MapFlags, ProtFlags};
        use std::num::NonZeroUsize;

        let length = NonZeroUsize::new(len)?;
        let prot = ProtFlags::PROT_READ | ProtFlags::PROT_WRITE | ProtFlags::PROT_EXEC;
        let flags = MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS;

        let start = target.saturating_sub(MAX_RANGE) & !(page_size() - 1);
        let end = target.saturating_add(MAX_RANGE);

        for hint in (start..end).step_by(page_size() * HINT_STEP_PAGES) {
            let Some(hint) = NonZeroUsize::new(hint) else {
                continue;
            };

            // SAFETY: anonymous mapping without MAP_FIXED never replaces existing memory
            let Ok(ptr) = (unsafe { mmap_anonymous(Some(hint), length, prot, flags) }) else {
                continue;
            };

            let base = ptr.as_ptr() as *mut u8;
            if distance(base as usize, target) < MAX_RANGE {
                return Some(base);
            }

            // SAFETY: the mapping was created above and is not referenced anywhere
            unsafe {
                let _ = munmap(ptr, len);
            }
        }

        tracing::error!("Failed to map trampoline page near {:#x}", target);
        None
    }

    #[cfg(windows)]
    fn map_page_near(&mut self, target: usize, len: usize) -> Option<*mut u8> {
        use windows::Win32::System::Memory::{
            VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
            PAGE_EXECUTE_READWRITE,
        };

        // VirtualAlloc rounds hints down to the 64KB allocation granularity
        let start = target.saturating_sub(MAX_RANGE) & !0xFFFF;
        let end = target.saturating_add(MAX_RANGE);

        for hint in (start..end).step_by(0x10000) {
            if hint == 0 {
                continue;
            }

            // SAFETY: reserving fresh memory at a hint never touches existing allocations
            let result = unsafe {
                VirtualAlloc(
                    Some(hint as *const std::ffi::c_void),
                    len,
                    MEM_COMMIT | MEM_RESERVE,
                    PAGE_EXECUTE_READWRITE,
                )
            };

            if result.is_null() {
                continue;
            }

            let base = result as *mut u8;
            if distance(base as usize, target) < MAX_RANGE {
                return Some(base);
            }

            // SAFETY: the allocation was created above and is not referenced anywhere
            unsafe {
                let _ = VirtualFree(result, 0, MEM_RELEASE);
            }
        }

        tracing::error!("Failed to map trampoline page near {:#x}", target);
        None
    }
}

/// Allocate `size` bytes of executable memory within rel32 reach of `target`
pub fn alloc_trampoline(target: usize, size: usize) -> Option<NonNull<u8>> {
    ALLOCATOR.lock().alloc_near(target, size)
}

/// Return a slot obtained from [`alloc_trampoline`] with the same `size`
///
/// Only for slots no patched target has ever jumped into.
pub fn release_trampoline(slot: NonNull<u8>, size: usize) {
    ALLOCATOR.lock().release(slot.as_ptr() as usize, size);
}
