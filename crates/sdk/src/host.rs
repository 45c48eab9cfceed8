//! Host structure and function type definitions
//!
//! These are opaque types representing the host's UI structures.
//! We don't model their internal layout - field offsets come from gamedata
//! and all access goes through the core crate's memory accessors.

use std::ffi::c_void;

/// Opaque type for a host UI window ("addon")
#[repr(C)]
pub struct AtkUnitBase {
    _opaque: [u8; 0],
}

/// Opaque type for the host's indexed string array
///
/// Holds a runtime-sized table of NUL-terminated string pointers that the
/// host's tooltip generators read from.
#[repr(C)]
pub struct StringArrayData {
    _opaque: [u8; 0],
}

/// Opaque type for the host's indexed integer array
#[repr(C)]
pub struct NumberArrayData {
    _opaque: [u8; 0],
}

/// Opaque type for an inventory slot record
#[repr(C)]
pub struct InventoryItem {
    _opaque: [u8; 0],
}

/// Opaque type for the cast bar addon
#[repr(C)]
pub struct CastBar {
    _opaque: [u8; 0],
}

/// Tooltip generator shared by the item and action detail windows
///
/// Reads `strings` and `numbers` to lay out the tooltip.
pub type GenerateTooltipFn = unsafe extern "C" fn(
    addon: *mut AtkUnitBase,
    numbers: *mut NumberArrayData,
    strings: *mut StringArrayData,
) -> *mut c_void;

/// Fired when the cursor moves over an inventory slot
///
/// The last argument points at the hovered inventory item record.
pub type ItemHoveredFn = unsafe extern "C" fn(
    a1: *mut c_void,
    a2: *mut *mut c_void,
    container_id: *mut i32,
    slot_id: *mut u16,
    a5: *mut c_void,
    slot_id_int: u32,
    item: *mut InventoryItem,
) -> u8;

/// Updates a cast bar with the action being cast and its display name
pub type UpdateCastBarFn =
    unsafe extern "C" fn(cast_bar: *mut CastBar, action_id: u32, action_name: *const u8);
