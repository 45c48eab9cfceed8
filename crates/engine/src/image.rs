//! Process image access
//!
//! Locates the executable code section of the host's main module so the
//! scanner knows which bytes to search.

use crate::error::HostError;

/// Section flag marking executable code in a PE section header
const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;

/// Bytes of the mapped image guaranteed to hold the PE headers
#[cfg_attr(not(windows), allow(dead_code))]
const PE_HEADER_PAGE: usize = 0x1000;

/// A readable, executable range of the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRegion {
    base: usize,
    len: usize,
}

impl CodeRegion {
    /// Describe an arbitrary range
    ///
    /// # Safety
    /// `base..base + len` must stay mapped and readable for as long as the
    /// region (or anything scanning it) is in use.
    pub unsafe fn new(base: *const u8, len: usize) -> Self {
        Self {
            base: base as usize,
            len,
        }
    }

    /// Describe a range backed by a slice that lives for the whole process
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            base: bytes.as_ptr() as usize,
            len: bytes.len(),
        }
    }

    /// Start address
    pub fn base(&self) -> usize {
        self.base
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `address` falls inside the region
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address - self.base < self.len
    }

    /// View the region as bytes
    ///
    /// # Safety
    /// The constructor's contract must still hold.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.base as *const u8, self.len)
    }

    /// Locate the executable section of the process's main module
    #[cfg(windows)]
    pub fn main_module() -> Result<Self, HostError> {
        use windows::core::PCWSTR;
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;

        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| HostError::ModuleNotFound(e.to_string()))?;
        let base = module.0 as *const u8;
        if base.is_null() {
            return Err(HostError::ModuleNotFound("null module handle".to_string()));
        }

        // SAFETY: the first page of a loaded PE image always holds its headers
        let headers = unsafe { std::slice::from_raw_parts(base, PE_HEADER_PAGE) };
        let (rva, size) = pe_code_section(headers)?;

        tracing::debug!(
            "Main module code section at {:x} (+{:x}, {} bytes)",
            base as usize,
            rva,
            size
        );

        Ok(Self {
            base: base as usize + rva as usize,
            len: size as usize,
        })
    }

    /// Locate the executable mapping of the process's main module
    #[cfg(unix)]
    pub fn main_module() -> Result<Self, HostError> {
        let exe = std::fs::read_link("/proc/self/exe")?;
        let exe = exe.to_string_lossy();
        let exe = exe.strip_suffix(" (deleted)").unwrap_or(&*exe);
        let maps = std::fs::read_to_string("/proc/self/maps")?;

        let (base, end) = executable_mapping(&maps, exe)
            .ok_or_else(|| HostError::NoCodeSection(exe.to_string()))?;

        tracing::debug!("Main module code mapping at {:x}-{:x} ({})", base, end, exe);

        Ok(Self {
            base,
            len: end - base,
        })
    }
}

/// Find the first executable mapping of `path` in a `/proc/<pid>/maps` dump
#[cfg_attr(not(unix), allow(dead_code))]
fn executable_mapping(maps: &str, path: &str) -> Option<(usize, usize)> {
    maps.lines().find_map(|line| {
        // Path is the sixth field, space padded, and may itself contain spaces
        let mut fields = line.splitn(6, ' ');
        let range = fields.next()?;
        let perms = fields.next()?;
        // offset, dev, inode
        let mapped = fields.nth(3)?.trim_start();
        let mapped = mapped.strip_suffix(" (deleted)").unwrap_or(mapped);

        if !perms.contains('x') || mapped != path {
            return None;
        }

        let (start, end) = range.split_once('-')?;
        let start = usize::from_str_radix(start, 16).ok()?;
        let end = usize::from_str_radix(end, 16).ok()?;
        (end > start).then_some((start, end))
    })
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Find the first executable section in a PE image's headers
///
/// Returns `(virtual address, virtual size)`.
#[cfg_attr(not(windows), allow(dead_code))]
fn pe_code_section(headers: &[u8]) -> Result<(u32, u32), HostError> {
    let malformed = |what: &str| HostError::MalformedHeaders(what.to_string());

    if headers.get(0..2) != Some(b"MZ") {
        return Err(malformed("missing DOS signature"));
    }
    let nt = read_u32(headers, 0x3C).ok_or_else(|| malformed("truncated DOS header"))? as usize;
    if headers.get(nt..nt + 4) != Some(b"PE\0\0") {
        return Err(malformed("missing NT signature"));
    }

    let file_header = nt + 4;
    let sections = read_u16(headers, file_header + 2).ok_or_else(|| malformed("file header"))?;
    let optional_size =
        read_u16(headers, file_header + 16).ok_or_else(|| malformed("file header"))? as usize;
    let first_section = file_header + 20 + optional_size;

    for i in 0..sections as usize {
        let section = first_section + i * 40;
        let size = read_u32(headers, section + 8).ok_or_else(|| malformed("section table"))?;
        let rva = read_u32(headers, section + 12).ok_or_else(|| malformed("section table"))?;
        let flags = read_u32(headers, section + 36).ok_or_else(|| malformed("section table"))?;

        if flags & IMAGE_SCN_MEM_EXECUTE != 0 && size > 0 {
            return Ok((rva, size));
        }
    }

    Err(HostError::NoCodeSection("main module".to_string()))
}
