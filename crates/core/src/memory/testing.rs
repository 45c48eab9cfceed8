//! In-process stand-ins for host arrays

use std::ffi::CStr;

use langswap_sdk::{InventoryItem, NumberArrayData, StringArrayData};

use super::ArrayLayout;

/// Layout of the fakes below, matching the built-in gamedata
pub const LAYOUT: ArrayLayout = ArrayLayout {
    size_offset: 8,
    table_offset: 32,
};

/// Inventory record offsets matching the built-in gamedata
pub const ITEM_ID_OFFSET: usize = 8;
pub const GLAMOUR_ID_OFFSET: usize = 48;

#[repr(C)]
struct Header<T> {
    _vtable: usize,
    size: i32,
    _pad: [u8; 20],
    table: *mut T,
}

pub struct FakeStringArray {
    header: Box<Header<*const u8>>,
    _slots: Vec<*const u8>,
    _backing: Vec<Box<[u8]>>,
}

impl FakeStringArray {
    pub fn new(texts: &[&str]) -> Self {
        let bytes: Vec<&[u8]> = texts.iter().map(|t| t.as_bytes()).collect();
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(values: &[&[u8]]) -> Self {
        let backing: Vec<Box<[u8]>> = values
            .iter()
            .map(|v| {
                let mut owned = v.to_vec();
                owned.push(0);
                owned.into_boxed_slice()
            })
            .collect();
        let mut slots: Vec<*const u8> = backing.iter().map(|b| b.as_ptr()).collect();
        let header = Box::new(Header {
            _vtable: 0,
            size: slots.len() as i32,
            _pad: [0; 20],
            table: slots.as_mut_ptr(),
        });
        Self {
            header,
            _slots: slots,
            _backing: backing,
        }
    }

    pub fn as_ptr(&mut self) -> *mut StringArrayData {
        (&mut *self.header as *mut Header<*const u8>).cast()
    }

    /// Current bytes of a slot as the host would read them
    pub fn bytes(&self, index: usize) -> Vec<u8> {
        let ptr = unsafe { *self.header.table.add(index) };
        unsafe { CStr::from_ptr(ptr.cast()) }.to_bytes().to_vec()
    }

    pub fn text(&self, index: usize) -> String {
        String::from_utf8(self.bytes(index)).unwrap()
    }
}

pub struct FakeNumberArray {
    header: Box<Header<i32>>,
    _values: Vec<i32>,
}

impl FakeNumberArray {
    pub fn new(values: &[i32]) -> Self {
        let mut values = values.to_vec();
        let header = Box::new(Header {
            _vtable: 0,
            size: values.len() as i32,
            _pad: [0; 20],
            table: values.as_mut_ptr(),
        });
        Self {
            header,
            _values: values,
        }
    }

    pub fn as_ptr(&self) -> *mut NumberArrayData {
        (&*self.header as *const Header<i32>).cast_mut().cast()
    }
}

/// An inventory record holding `item_id` and `glamour_id`
pub struct FakeInventoryItem(Box<[u8; 64]>);

impl FakeInventoryItem {
    pub fn new(item_id: u32, glamour_id: u32) -> Self {
        let mut record = Box::new([0u8; 64]);
        record[ITEM_ID_OFFSET..ITEM_ID_OFFSET + 4].copy_from_slice(&item_id.to_le_bytes());
        record[GLAMOUR_ID_OFFSET..GLAMOUR_ID_OFFSET + 4].copy_from_slice(&glamour_id.to_le_bytes());
        Self(record)
    }

    pub fn as_ptr(&mut self) -> *mut InventoryItem {
        self.0.as_mut_ptr().cast()
    }
}
