//! Bounds-checked views over the host's indexed arrays
//!
//! Both array kinds start with a runtime element count followed, at a
//! gamedata offset, by a pointer to their element table.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr::NonNull;

use langswap_sdk::{NumberArrayData, StringArrayData};

use crate::gamedata::{Gamedata, GamedataError};

use super::markers::preserve_markers;
use super::sestring::SeString;
use super::{MemoryError, TextArena};

/// Where an array keeps its element count and element table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayLayout {
    /// Offset of the `i32` element count
    pub size_offset: usize,
    /// Offset of the pointer to the element table
    pub table_offset: usize,
}

impl ArrayLayout {
    pub fn strings(gamedata: &Gamedata) -> Result<Self, GamedataError> {
        Ok(Self {
            size_offset: gamedata.get_usize("StringArrayData.Size")?,
            table_offset: gamedata.get_usize("StringArrayData.Strings")?,
        })
    }

    pub fn numbers(gamedata: &Gamedata) -> Result<Self, GamedataError> {
        Ok(Self {
            size_offset: gamedata.get_usize("NumberArrayData.Size")?,
            table_offset: gamedata.get_usize("NumberArrayData.Ints")?,
        })
    }
}

/// Read a `T` at `offset` bytes into a host record
///
/// # Safety
/// `base + offset` must be readable for `size_of::<T>()` bytes.
pub unsafe fn read_field<T: Copy>(base: *const u8, offset: usize) -> Result<T, MemoryError> {
    if base.is_null() {
        return Err(MemoryError::NullBuffer);
    }
    Ok(base.add(offset).cast::<T>().read_unaligned())
}

/// Element count of an array, negative counts read as empty
unsafe fn element_count(base: NonNull<u8>, layout: ArrayLayout) -> usize {
    let size: i32 = base.as_ptr().add(layout.size_offset).cast::<i32>().read_unaligned();
    usize::try_from(size).unwrap_or(0)
}

/// Pointer to the element table, or null
unsafe fn table<T>(base: NonNull<u8>, layout: ArrayLayout) -> *mut T {
    base.as_ptr()
        .add(layout.table_offset)
        .cast::<*mut T>()
        .read_unaligned()
}

/// The host's indexed table of NUL-terminated strings
pub struct StringArray<'a> {
    base: NonNull<u8>,
    layout: ArrayLayout,
    arena: &'a TextArena,
    _host: PhantomData<&'a mut StringArrayData>,
}

impl<'a> StringArray<'a> {
    /// Wrap a host string array. Rewritten slots point into `arena`.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live string array laid out as
    /// `layout` describes, for the whole lifetime `'a`.
    pub unsafe fn from_raw(
        ptr: *mut StringArrayData,
        layout: ArrayLayout,
        arena: &'a TextArena,
    ) -> Result<Self, MemoryError> {
        let base = NonNull::new(ptr.cast::<u8>()).ok_or(MemoryError::NullBuffer)?;
        Ok(Self {
            base,
            layout,
            arena,
            _host: PhantomData,
        })
    }

    /// Element count reported by the host
    pub fn len(&self) -> usize {
        // SAFETY: from_raw's contract
        unsafe { element_count(self.base, self.layout) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_index(&self, index: usize) -> Result<*mut *const u8, MemoryError> {
        let len = self.len();
        if index >= len {
            return Err(MemoryError::OutOfRange { index, len });
        }
        // SAFETY: from_raw's contract
        let slots = unsafe { table::<*const u8>(self.base, self.layout) };
        if slots.is_null() {
            return Err(MemoryError::NullBuffer);
        }
        // SAFETY: index < len, the table holds len entries
        Ok(unsafe { slots.add(index) })
    }

    /// Copy of the raw encoded bytes of a slot, without the terminator
    ///
    /// Returns `None` for a null slot. The copy stays valid after the slot is
    /// rewritten.
    pub fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>, MemoryError> {
        let slot = self.check_index(index)?;
        // SAFETY: slot is inside the table
        let ptr = unsafe { *slot };
        if ptr.is_null() {
            return Ok(None);
        }
        // SAFETY: the host keeps non-null slots NUL-terminated
        Ok(Some(unsafe { CStr::from_ptr(ptr.cast()) }.to_bytes().to_vec()))
    }

    /// Literal text of a slot, formatting removed
    pub fn get(&self, index: usize) -> Result<Option<String>, MemoryError> {
        match self.get_bytes(index)? {
            Some(bytes) => Ok(Some(SeString::parse(&bytes)?.to_plain_text())),
            None => Ok(None),
        }
    }

    /// Point a slot at a process-owned copy of `bytes`
    ///
    /// Nothing is written unless every check passes.
    pub fn set_bytes(&mut self, index: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let slot = self.check_index(index)?;
        let ptr = self.arena.store(self.base.as_ptr() as usize, index, bytes)?;
        // SAFETY: slot is inside the table, the host reads it as a string pointer
        unsafe { slot.write(ptr) };
        Ok(())
    }

    /// Replace a slot with plain text
    pub fn set(&mut self, index: usize, text: &str) -> Result<(), MemoryError> {
        self.set_bytes(index, text.as_bytes())
    }

    /// Replace the first literal segment of a slot, keeping its formatting
    /// and any of `glyphs` it contained
    ///
    /// Empty or null slots are written as plain text.
    pub fn set_preserving(
        &mut self,
        index: usize,
        text: &str,
        glyphs: &[char],
    ) -> Result<(), MemoryError> {
        let mut formatted = match self.get_bytes(index)? {
            Some(bytes) if !bytes.is_empty() => SeString::parse(&bytes)?,
            _ => return self.set(index, text),
        };

        let replaced = formatted.replace_first_text(|old| preserve_markers(old, text, glyphs));
        if !replaced {
            tracing::debug!("Slot {} has no literal text, leaving it untouched", index);
            return Ok(());
        }

        self.set_bytes(index, &formatted.encode())
    }
}

/// The host's indexed table of integers
pub struct NumberArray<'a> {
    base: NonNull<u8>,
    layout: ArrayLayout,
    _host: PhantomData<&'a NumberArrayData>,
}

impl<'a> NumberArray<'a> {
    /// # Safety
    /// `ptr` must be null or point to a live number array laid out as
    /// `layout` describes, for the whole lifetime `'a`.
    pub unsafe fn from_raw(
        ptr: *const NumberArrayData,
        layout: ArrayLayout,
    ) -> Result<Self, MemoryError> {
        let base = NonNull::new(ptr.cast::<u8>().cast_mut()).ok_or(MemoryError::NullBuffer)?;
        Ok(Self {
            base,
            layout,
            _host: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        // SAFETY: from_raw's contract
        unsafe { element_count(self.base, self.layout) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<i32, MemoryError> {
        let len = self.len();
        if index >= len {
            return Err(MemoryError::OutOfRange { index, len });
        }
        // SAFETY: from_raw's contract
        let ints = unsafe { table::<i32>(self.base, self.layout) };
        if ints.is_null() {
            return Err(MemoryError::NullBuffer);
        }
        // SAFETY: index < len
        Ok(unsafe { ints.add(index).read() })
    }
}
