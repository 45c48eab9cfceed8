//! Host-side callback table
//!
//! The bridge hands over a table of C callbacks on load. It is adapted here
//! into the [`DataSource`] and [`AddonHost`] the core works against.

use std::ffi::{c_char, c_void, CString};

use langswap_engine::{AddonHost, DataSource, EntityText};
use langswap_sdk::{EntityKind, Language};

/// Localized row returned by the bridge
///
/// The pointers only need to stay valid until the lookup callback returns.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LangSwapText {
    pub name: *const u8,
    pub name_len: usize,
    pub description: *const u8,
    pub description_len: usize,
}

impl Default for LangSwapText {
    fn default() -> Self {
        Self {
            name: std::ptr::null(),
            name_len: 0,
            description: std::ptr::null(),
            description_len: 0,
        }
    }
}

/// Fill `out` with the row `id` of table `kind` in `language`
pub type LookupFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    kind: u8,
    id: u32,
    language: u8,
    out: *mut LangSwapText,
) -> bool;

pub type AddonFn = unsafe extern "C" fn(user_data: *mut c_void, addon: *const c_char) -> bool;

pub type SetTextFn =
    unsafe extern "C" fn(user_data: *mut c_void, addon: *const c_char, text: *const c_char) -> bool;

/// Services provided by the host-side bridge
///
/// A null `code_base` makes the plugin locate the main module itself.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LangSwapApi {
    pub user_data: *mut c_void,
    pub lookup: Option<LookupFn>,
    pub is_visible: Option<AddonFn>,
    pub regenerate: Option<AddonFn>,
    pub set_text: Option<SetTextFn>,
    pub code_base: *const u8,
    pub code_len: usize,
}

/// [`LangSwapApi`] as the core's collaborator traits
#[derive(Clone, Copy)]
pub struct Bridge {
    api: LangSwapApi,
}

// SAFETY: the bridge guarantees its callbacks and user data stay valid from
// load to unload; they are only invoked from the host thread.
unsafe impl Send for Bridge {}
unsafe impl Sync for Bridge {}

impl Bridge {
    pub fn new(api: LangSwapApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &LangSwapApi {
        &self.api
    }

    fn call_addon(&self, callback: Option<AddonFn>, addon: &str) -> bool {
        let (Some(callback), Ok(addon)) = (callback, CString::new(addon)) else {
            return false;
        };
        // SAFETY: the callback table is valid while the plugin is loaded
        unsafe { callback(self.api.user_data, addon.as_ptr()) }
    }
}

/// Copy a bridge-owned byte range into an owned string
///
/// # Safety
/// `ptr` must be null or valid for `len` bytes.
unsafe fn copy_text(ptr: *const u8, len: usize) -> String {
    if ptr.is_null() || len == 0 {
        return String::new();
    }
    String::from_utf8_lossy(std::slice::from_raw_parts(ptr, len)).into_owned()
}

impl DataSource for Bridge {
    fn lookup(&self, kind: EntityKind, id: u32, language: Language) -> Option<EntityText> {
        let lookup = self.api.lookup?;
        let mut out = LangSwapText::default();

        // SAFETY: the callback table is valid while the plugin is loaded and
        // `out` outlives the call
        let found = unsafe { lookup(self.api.user_data, kind as u8, id, language.id(), &mut out) };
        if !found {
            return None;
        }

        // SAFETY: the bridge keeps the returned ranges alive until we return
        let text = unsafe {
            EntityText::new(
                copy_text(out.name, out.name_len),
                copy_text(out.description, out.description_len),
            )
        };
        Some(text)
    }
}

impl AddonHost for Bridge {
    fn is_visible(&self, addon: &str) -> bool {
        self.call_addon(self.api.is_visible, addon)
    }

    fn regenerate(&self, addon: &str) -> bool {
        self.call_addon(self.api.regenerate, addon)
    }

    fn set_text(&self, addon: &str, text: &str) -> bool {
        let (Some(set_text), Ok(addon), Ok(text)) =
            (self.api.set_text, CString::new(addon), CString::new(text))
        else {
            return false;
        };
        // SAFETY: the callback table is valid while the plugin is loaded
        unsafe { set_text(self.api.user_data, addon.as_ptr(), text.as_ptr()) }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Bridge callbacks backed by static data

    use super::*;
    use std::ffi::CStr;
    use std::sync::Mutex;

    static NAME: &[u8] = "Potion de vie".as_bytes();
    static DESCRIPTION: &[u8] = b"Restaure des PV.";

    pub static SET_TEXT_CALLS: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

    pub unsafe extern "C" fn lookup(
        _user_data: *mut c_void,
        kind: u8,
        id: u32,
        language: u8,
        out: *mut LangSwapText,
    ) -> bool {
        if kind != EntityKind::Item as u8 || id != 1 || language != Language::French.id() {
            return false;
        }
        *out = LangSwapText {
            name: NAME.as_ptr(),
            name_len: NAME.len(),
            description: DESCRIPTION.as_ptr(),
            description_len: DESCRIPTION.len(),
        };
        true
    }

    pub unsafe extern "C" fn visible(_user_data: *mut c_void, addon: *const c_char) -> bool {
        CStr::from_ptr(addon).to_bytes() == b"_CastBar"
    }

    pub unsafe extern "C" fn set_text(
        _user_data: *mut c_void,
        addon: *const c_char,
        text: *const c_char,
    ) -> bool {
        let addon = CStr::from_ptr(addon).to_string_lossy().into_owned();
        let text = CStr::from_ptr(text).to_string_lossy().into_owned();
        SET_TEXT_CALLS.lock().unwrap().push((addon, text));
        true
    }

    pub fn api() -> LangSwapApi {
        LangSwapApi {
            user_data: std::ptr::null_mut(),
            lookup: Some(lookup),
            is_visible: Some(visible),
            regenerate: None,
            set_text: Some(set_text),
            code_base: std::ptr::null(),
            code_len: 0,
        }
    }
}
