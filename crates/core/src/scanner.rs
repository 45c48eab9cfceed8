//! Signature scanning
//!
//! Locates function entry points inside the host's code section by byte
//! pattern, independent of the absolute address a given build loads at.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use langswap_engine::CodeRegion;
use parking_lot::Mutex;
use thiserror::Error;

/// `call rel32` opcode
const CALL_REL32: u8 = 0xE8;

/// `jmp rel32` opcode
const JMP_REL32: u8 = 0xE9;

/// Errors that can occur when parsing or scanning for a signature
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),

    #[error("Signature not found in memory: {0}")]
    NotFound(String),

    #[error("Relative target of {name} at {address:x} lies outside the code section")]
    BadRelativeTarget { name: String, address: usize },
}

/// A byte pattern with wildcards
///
/// Parsed from strings like `"48 89 5C 24 ?? 55 56"`. Immutable once built.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SignaturePattern {
    bytes: Vec<Option<u8>>,
}

impl SignaturePattern {
    /// Parse a signature pattern string into bytes
    ///
    /// Supports:
    /// - Hex bytes: "55 48 89 E5"
    /// - Wildcards: "55 ? 89 E5" or "55 ?? 89 E5"
    pub fn parse(pattern: &str) -> Result<Self, ScanError> {
        let mut bytes = Vec::new();

        for part in pattern.split_whitespace() {
            if part == "?" || part == "??" {
                bytes.push(None);
            } else {
                let byte = u8::from_str_radix(part, 16).map_err(|_| {
                    ScanError::InvalidSignature(format!("Invalid hex byte: {}", part))
                })?;
                bytes.push(Some(byte));
            }
        }

        if bytes.iter().all(Option::is_none) {
            return Err(ScanError::InvalidSignature(
                "Pattern has no fixed bytes".to_string(),
            ));
        }

        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    /// Whether the pattern starts on a relative call or jump
    fn is_relative_branch(&self) -> bool {
        matches!(self.bytes.first(), Some(Some(CALL_REL32 | JMP_REL32)))
    }

    /// Find the first offset in `haystack` where the pattern matches
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        if self.bytes.is_empty() || haystack.len() < self.bytes.len() {
            return None;
        }

        // Anchor on the first fixed byte to skip most candidates quickly
        let (anchor_at, anchor) = self
            .bytes
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.map(|b| (i, b)))?;

        let last_start = haystack.len() - self.bytes.len();
        let mut start = 0;

        while start <= last_start {
            let window = &haystack[start + anchor_at..=last_start + anchor_at];
            let hit = window.iter().position(|&b| b == anchor)?;
            let candidate = start + hit;

            let matched = self
                .bytes
                .iter()
                .zip(&haystack[candidate..candidate + self.bytes.len()])
                .all(|(expected, actual)| expected.map_or(true, |e| e == *actual));

            if matched {
                return Some(candidate);
            }
            start = candidate + 1;
        }

        None
    }
}

impl FromStr for SignaturePattern {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for SignaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignaturePattern(")?;
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match byte {
                Some(b) => write!(f, "{:02X}", b)?,
                None => f.write_str("??")?,
            }
        }
        f.write_str(")")
    }
}

/// Scans one code region for signature patterns
///
/// Every lookup walks the region once; results are memoized per pattern so
/// hooks re-enabled later do not pay for a second scan.
pub struct Scanner {
    region: CodeRegion,
    cache: Mutex<HashMap<SignaturePattern, Option<usize>>>,
}

impl Scanner {
    pub fn new(region: CodeRegion) -> Self {
        Self {
            region,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn region(&self) -> CodeRegion {
        self.region
    }

    /// Find the address a pattern identifies
    ///
    /// When the pattern begins on a `call rel32`/`jmp rel32`, the branch
    /// destination is returned instead of the match address.
    pub fn find(&self, name: &str, pattern: &SignaturePattern) -> Result<usize, ScanError> {
        if let Some(cached) = self.cache.lock().get(pattern) {
            return cached.ok_or_else(|| ScanError::NotFound(name.to_string()));
        }

        let result = self.scan(name, pattern);
        let address = match result {
            Ok(address) => Some(address),
            Err(ScanError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        self.cache.lock().insert(pattern.clone(), address);

        match address {
            Some(address) => {
                tracing::debug!("Resolved {} at {:x}", name, address);
                Ok(address)
            }
            None => Err(ScanError::NotFound(name.to_string())),
        }
    }

    /// Parse and resolve a pattern string in one step
    pub fn find_str(&self, name: &str, pattern: &str) -> Result<usize, ScanError> {
        self.find(name, &SignaturePattern::parse(pattern)?)
    }

    fn scan(&self, name: &str, pattern: &SignaturePattern) -> Result<usize, ScanError> {
        // SAFETY: the region's constructor guarantees it stays readable
        let code = unsafe { self.region.as_slice() };
        let offset = pattern
            .find_in(code)
            .ok_or_else(|| ScanError::NotFound(name.to_string()))?;
        let address = self.region.base() + offset;

        if !pattern.is_relative_branch() {
            return Ok(address);
        }

        let displacement = code
            .get(offset + 1..offset + 5)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| ScanError::BadRelativeTarget {
                name: name.to_string(),
                address,
            })?;
        let target = (address as isize + 5 + displacement as isize) as usize;

        if !self.region.contains(target) {
            return Err(ScanError::BadRelativeTarget {
                name: name.to_string(),
                address,
            });
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(bytes: &[u8]) -> CodeRegion {
        CodeRegion::from_static(Box::leak(bytes.to_vec().into_boxed_slice()))
    }

    #[test]
    fn test_parse_signature() {
        let pattern = SignaturePattern::parse("55 48 89 E5").unwrap();
        assert_eq!(
            pattern.bytes(),
            &[Some(0x55), Some(0x48), Some(0x89), Some(0xE5)]
        );

        let pattern = SignaturePattern::parse("55 ? 89 ??").unwrap();
        assert_eq!(pattern.bytes(), &[Some(0x55), None, Some(0x89), None]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(SignaturePattern::parse("55 ZZ").is_err());
        assert!(SignaturePattern::parse("").is_err());
        assert!(SignaturePattern::parse("?? ??").is_err());
    }

    #[test]
    fn test_find_in() {
        let data = [0x00, 0x55, 0x48, 0x89, 0xE5, 0x00];
        let pattern = SignaturePattern::parse("55 48 89 E5").unwrap();
        assert_eq!(pattern.find_in(&data), Some(1));
    }

    #[test]
    fn test_find_in_with_wildcard() {
        let data = [0x00, 0x55, 0xFF, 0x89, 0xE5, 0x00];
        let pattern = SignaturePattern::parse("55 ?? 89 E5").unwrap();
        assert_eq!(pattern.find_in(&data), Some(1));
    }

    #[test]
    fn test_find_in_leading_wildcard_and_false_start() {
        let data = [0x55, 0x00, 0x11, 0x55, 0x48, 0x22];
        let pattern = SignaturePattern::parse("?? 55 48").unwrap();
        assert_eq!(pattern.find_in(&data), Some(2));

        let pattern = SignaturePattern::parse("55 48 23").unwrap();
        assert_eq!(pattern.find_in(&data), None);
    }

    #[test]
    fn test_find_at_end_of_region() {
        let data = [0x00, 0x00, 0xAA, 0xBB];
        let pattern = SignaturePattern::parse("AA BB").unwrap();
        assert_eq!(pattern.find_in(&data), Some(2));
        assert_eq!(SignaturePattern::parse("BB CC").unwrap().find_in(&data), None);
    }

    #[test]
    fn test_scanner_returns_absolute_address() {
        let region = leak(&[0x90, 0x90, 0x48, 0x83, 0xEC, 0x38, 0xC3]);
        let scanner = Scanner::new(region);
        let address = scanner.find_str("CastBar", "48 83 EC 38").unwrap();
        assert_eq!(address, region.base() + 2);
    }

    #[test]
    fn test_scanner_follows_relative_call() {
        // 0: call +3 (-> 8), 5: nop nop nop, 8: ret
        let region = leak(&[0xE8, 0x03, 0x00, 0x00, 0x00, 0x90, 0x90, 0x90, 0xC3]);
        let scanner = Scanner::new(region);
        let address = scanner.find_str("Call", "E8 ?? ?? ?? ?? 90 90").unwrap();
        assert_eq!(address, region.base() + 8);
    }

    #[test]
    fn test_scanner_rejects_call_outside_region() {
        let region = leak(&[0xE8, 0x00, 0x10, 0x00, 0x00, 0x90]);
        let scanner = Scanner::new(region);
        assert!(matches!(
            scanner.find_str("Call", "E8 ?? ?? ?? ?? 90"),
            Err(ScanError::BadRelativeTarget { .. })
        ));
    }

    #[test]
    fn test_scanner_not_found_is_cached() {
        let scanner = Scanner::new(leak(&[0x00; 32]));
        let pattern = SignaturePattern::parse("DE AD BE EF").unwrap();
        assert_eq!(
            scanner.find("Missing", &pattern),
            Err(ScanError::NotFound("Missing".to_string()))
        );
        assert_eq!(scanner.cache.lock().get(&pattern), Some(&None));
    }
}
